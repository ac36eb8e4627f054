//! Error types for payment intent operations
//!
//! Every public operation in this crate returns [`Result`], so failures are
//! values the caller inspects rather than panics. The variants map onto a small
//! taxonomy exposed through [`ErrorKind`]:
//!
//! - **Validation** - the caller supplied unusable input; detected before any request
//! - **Transport** - the request failed on the wire or the server rejected it
//! - **Storage** - the idempotency storage backend failed
//! - **Config** - the client was configured with invalid settings
//! - **InvalidResponse** - the server answered 2xx with a body we cannot use
//!
//! An "already cancelled" answer to a cancel request is not an error at all, and a
//! poll timeout surfaces as an `expired` status update, not as a `PaymentError`.

use thiserror::Error;

/// Result type alias for payment intent operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors produced by the payment intent client, storage and poller
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller input rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Request failed in transit or the server answered with a non-2xx status
    #[error("{message}")]
    Transport {
        /// Best-effort message (server message, then transport message, then fallback)
        message: String,
        /// HTTP status, when the server answered at all
        status: Option<u16>,
    },

    /// Server answered 2xx but the body was not usable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Idempotency storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse classification of a [`PaymentError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    InvalidResponse,
    Storage,
    Config,
}

impl PaymentError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport { .. } | Self::Http(_) => ErrorKind::Transport,
            Self::InvalidResponse(_) | Self::Json(_) => ErrorKind::InvalidResponse,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) | Self::Url(_) => ErrorKind::Config,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, timeouts and 5xx answers are retryable; 4xx answers
    /// and local errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code >= 500,
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}
