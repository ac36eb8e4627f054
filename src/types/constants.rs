//! Endpoint paths, header names and defaults

use std::time::Duration;

/// Endpoint paths relative to the API base URL
pub mod endpoints {
    /// Collection endpoint for creating intents
    pub const PAYMENT_INTENTS: &str = "payment-intents";

    /// Status endpoint for a payment
    pub fn status(payment_id: &str) -> String {
        format!("{}/{}/status", PAYMENT_INTENTS, payment_id)
    }

    /// Cancel endpoint for a payment
    pub fn cancel(payment_id: &str) -> String {
        format!("{}/{}/cancel", PAYMENT_INTENTS, payment_id)
    }

    /// QR lookup endpoint, keyed by the processor's intent id
    pub fn qr(payment_intent_id: &str) -> String {
        format!("{}/{}/qr", PAYMENT_INTENTS, payment_intent_id)
    }

    /// QR image download endpoint, keyed by the internal payment id
    pub fn qr_download(payment_id: &str) -> String {
        format!("{}/{}/qr/download", PAYMENT_INTENTS, payment_id)
    }
}

/// Header names used on the wire
pub mod headers {
    pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
    pub const CSRF_TOKEN: &str = "x-csrf-token";
    pub const REQUEST_ID: &str = "x-request-id";
}

/// Query parameter carrying the cache-busting timestamp
pub const CACHE_BUSTER_PARAM: &str = "t";

/// Operation name used in cancel idempotency scope keys
pub const CANCEL_PAYMENT_OPERATION: &str = "cancelPayment";

/// Timeout for mutating calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for status reads
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport retries for a cancel request after the first attempt
pub const DEFAULT_CANCEL_RETRIES: u32 = 2;

/// Base backoff between cancel retries; doubles each attempt
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Interval between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(6_000);

/// How long a poll session waits for a terminal status
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Default lifetime of a persisted idempotency token in session-scoped backends
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);
