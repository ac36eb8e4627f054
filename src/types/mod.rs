//! Core types for payment intents
//!
//! This module defines the data model shared by the client and the poller:
//! the canonical status vocabulary, payment intent records, checkout payloads,
//! operation results and client configuration.
//!
//! # Architecture
//!
//! The types module is organized as follows:
//! - [`status`] - Canonical [`PaymentStatus`] and the backend status mapper
//! - [`intent`] - [`PaymentIntent`], checkout payloads and operation results
//! - [`config`] - [`ClientConfig`] for the payments API client
//! - [`constants`] - Endpoint paths, header names and timing defaults
//!
//! # Examples
//!
//! ## Mapping Backend Statuses
//!
//! ```
//! use rust_payintent::types::{map_backend_status, PaymentStatus};
//!
//! assert_eq!(map_backend_status("awaiting_payment"), PaymentStatus::Pending);
//! assert_eq!(map_backend_status("paid"), PaymentStatus::Succeeded);
//! assert_eq!(map_backend_status("weird_unknown").as_str(), "weird_unknown");
//! ```
//!
//! ## Building a Checkout
//!
//! ```
//! use rust_payintent::types::{CheckoutItem, CheckoutPayload};
//! use rust_decimal::Decimal;
//! use serde_json::json;
//!
//! let checkout = CheckoutPayload::new(vec![
//!     CheckoutItem::new("sku-1", 2).with_unit_price(Decimal::new(1250, 2)),
//! ])
//! .with_field("shippingMethod", json!("express"));
//!
//! assert!(!checkout.is_empty());
//! ```

pub mod config;
pub mod constants;
pub mod intent;
pub mod status;

// Re-export commonly used types
pub use config::ClientConfig;
pub use intent::{
    CancelOutcome, CheckoutItem, CheckoutPayload, CreateIntentRequest, CreatedIntent,
    PaymentIntent, QrArtifact, StatusQueryResult,
};
pub use status::{map_backend_status, PaymentStatus};
