//! # Payment Intent Client
//!
//! Client-side orchestration for externally processed payments: issue mutating
//! payment requests exactly once despite retries, and watch a payment's status
//! until it settles.
//!
//! ## Features
//!
//! - **Idempotent cancels**: one token per logical cancel, reused across retries
//!   and cleared once the server confirms
//! - **Uniform results**: transport failures, bad input and odd responses all come
//!   back as [`PaymentError`] values
//! - **Canonical statuses**: backend vocabulary folded into [`PaymentStatus`]
//! - **Self-terminating polling**: one session per payment, immediate first check,
//!   change-only callbacks, hard timeout
//! - **Pluggable storage**: in-memory by default, Redis with the `redis` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_payintent::{
//!     client::PaymentIntentClient,
//!     poller::StatusPoller,
//!     types::{CheckoutItem, CheckoutPayload, ClientConfig},
//! };
//! use rust_decimal::Decimal;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> rust_payintent::Result<()> {
//! let client = Arc::new(PaymentIntentClient::in_memory(ClientConfig::from_env()?)?);
//!
//! let checkout = CheckoutPayload::new(vec![CheckoutItem::new("sku-1", 1)]);
//! let created = client
//!     .create_intent(Decimal::new(990, 2), "Coffee", HashMap::new(), &checkout)
//!     .await?;
//!
//! let poller = StatusPoller::new(client.clone());
//! let handle = poller.start(&created.intent.id, |update| {
//!     println!("payment is now {}", update.status);
//! });
//! handle.finished().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`redis`**: Enable [`storage::redis_storage::RedisSessionStorage`]

pub mod auth;
pub mod client;
pub mod error;
pub mod idempotency;
pub mod poller;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use auth::{AuthProvider, StaticAuth};
pub use client::PaymentIntentClient;
pub use error::{ErrorKind, PaymentError, Result};
pub use idempotency::IdempotencyKeyStore;
pub use poller::{PollHandle, PollOptions, PollUpdate, StatusPoller, StatusSource};
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use types::*;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
