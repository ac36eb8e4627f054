//! Payment intent records and operation results

use super::status::PaymentStatus;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One externally tracked payment attempt
///
/// Amount and currency never change after creation. Only `status` moves, and only
/// by re-fetching from the server. Only `id` is required on the wire; a fresh
/// intent that omits the rest reads as pending with no amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Internal identifier, stable once created
    pub id: String,
    /// Identifier issued by the external processor
    #[serde(default, alias = "payment_intent_id")]
    pub payment_intent_id: Option<String>,
    /// Canonical status
    #[serde(default)]
    pub status: PaymentStatus,
    /// Amount in major currency units
    #[serde(default)]
    pub amount: Decimal,
    /// ISO currency code, empty when the server did not echo it
    #[serde(default)]
    pub currency: String,
    /// QR code to pay with, while the intent is collectible
    #[serde(default, alias = "qr_code_url", skip_serializing_if = "Option::is_none")]
    pub qr_code_url: Option<String>,
    /// When the intent stops being collectible
    #[serde(default, alias = "expires_at", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    /// Whether the intent has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the payer can still pay this intent at `now`
    pub fn is_collectible(&self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() || self.qr_code_url.is_none() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// A single line item in a checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// Product or SKU identifier
    pub product_id: String,
    /// Units ordered
    pub quantity: u32,
    /// Price per unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    /// Anything else the storefront attaches
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckoutItem {
    /// Create a new checkout item
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price: None,
            extra: Map::new(),
        }
    }

    /// Set the unit price
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// Checkout data forwarded with an intent creation request
///
/// Pricing, shipping and promotions are computed elsewhere; this crate only
/// checks that there is something to pay for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPayload {
    /// Line items; must not be empty
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    /// Remaining checkout fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckoutPayload {
    /// Create a checkout payload from line items
    pub fn new(items: Vec<CheckoutItem>) -> Self {
        Self {
            items,
            extra: Map::new(),
        }
    }

    /// Attach an extra pass-through field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether the payload carries no line items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body of an intent creation request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub amount: Decimal,
    pub description: String,
    pub metadata: HashMap<String, Value>,
    pub checkout_data: CheckoutPayload,
}

/// Result of a successful intent creation
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    /// The intent as the server created it
    pub intent: PaymentIntent,
    /// Hosted page to send the payer to, if the processor provides one
    pub redirect_url: Option<String>,
    /// Response body as received
    pub raw: Value,
}

/// Normalized answer to a status query
#[derive(Debug, Clone)]
pub struct StatusQueryResult {
    /// Canonical status
    pub status: PaymentStatus,
    /// The intent record, when the body contained a parseable one
    pub payment: Option<PaymentIntent>,
    /// Response body as received
    pub raw: Value,
}

/// Result of a cancel request
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// Payment that was cancelled
    pub payment_id: String,
    /// The server reported the payment was already in a terminal state
    pub already_cancelled: bool,
    /// Response body as received
    pub raw: Value,
}

/// A downloaded QR image
#[derive(Debug, Clone)]
pub struct QrArtifact {
    /// Image bytes
    pub bytes: Bytes,
    /// Content type reported by the server
    pub content_type: Option<String>,
}
