//! Canonical payment status and backend status mapping

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical payment status
///
/// The backend emits a wider vocabulary than this; [`map_backend_status`] folds
/// it into these variants. Values we do not recognise are kept verbatim in
/// [`PaymentStatus::Other`] rather than being forced into `Failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// Waiting for the payer; every intent starts here
    #[default]
    Pending,
    /// Payer acted, processor has not settled yet
    Processing,
    /// Funds collected
    Succeeded,
    /// Processor rejected the payment
    Failed,
    /// Collection window closed, or the poller gave up waiting
    Expired,
    /// Unrecognised backend status, passed through unchanged
    Other(String),
}

impl PaymentStatus {
    /// String form of the status
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Other(raw) => raw,
        }
    }

    /// Whether no further transition is expected from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Expired)
    }
}

/// Map a backend status string onto the canonical vocabulary
///
/// Total and deterministic: every input maps to exactly one status and nothing
/// panics.
pub fn map_backend_status(raw: &str) -> PaymentStatus {
    match raw {
        "awaiting_payment" | "pending" => PaymentStatus::Pending,
        "processing" => PaymentStatus::Processing,
        "paid" | "succeeded" => PaymentStatus::Succeeded,
        "failed" => PaymentStatus::Failed,
        "expired" => PaymentStatus::Expired,
        other => PaymentStatus::Other(other.to_string()),
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PaymentStatus {
    fn from(raw: &str) -> Self {
        map_backend_status(raw)
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(map_backend_status(&raw))
    }
}
