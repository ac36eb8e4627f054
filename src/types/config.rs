//! Client configuration

use super::constants::{
    DEFAULT_CANCEL_RETRIES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_STATUS_TIMEOUT,
};
use crate::auth::{AuthProvider, StaticAuth};
use crate::{PaymentError, Result};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`PaymentIntentClient`](crate::client::PaymentIntentClient)
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the payments API
    pub base_url: String,
    /// Timeout for mutating calls (create, cancel)
    pub timeout: Duration,
    /// Timeout for status reads
    pub status_timeout: Duration,
    /// Transport retries for cancel after the first attempt
    pub max_cancel_retries: u32,
    /// Base backoff between cancel retries
    pub retry_base_delay: Duration,
    /// Credentials source
    pub auth: Arc<dyn AuthProvider>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("status_timeout", &self.status_timeout)
            .field("max_cancel_retries", &self.max_cancel_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("auth", &"<provider>")
            .finish()
    }
}

impl ClientConfig {
    /// Create a new client config with anonymous credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            max_cancel_retries: DEFAULT_CANCEL_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            auth: Arc::new(StaticAuth::anonymous()),
        }
    }

    /// Build a config from `PAYMENT_API_*` environment variables
    ///
    /// `PAYMENT_API_URL` is required. `PAYMENT_API_TOKEN`, `PAYMENT_API_CSRF_TOKEN`
    /// and `PAYMENT_API_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("PAYMENT_API_URL")
            .map_err(|_| PaymentError::config("PAYMENT_API_URL must be set"))?;

        let auth = StaticAuth::anonymous();
        auth.set_bearer(env::var("PAYMENT_API_TOKEN").ok());
        auth.set_csrf(env::var("PAYMENT_API_CSRF_TOKEN").ok());

        let mut config = Self::new(base_url).with_auth(Arc::new(auth));

        if let Ok(secs) = env::var("PAYMENT_API_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PaymentError::config(format!("Invalid PAYMENT_API_TIMEOUT_SECS: {}", secs))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(PaymentError::config("Payments API URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(PaymentError::config(
                "Payments API URL must start with http:// or https://",
            ));
        }

        if self.timeout.is_zero() || self.status_timeout.is_zero() {
            return Err(PaymentError::config("Request timeouts must be non-zero"));
        }

        Ok(())
    }

    /// Set the timeout for mutating calls
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout for status reads
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Set the number of cancel retries
    pub fn with_max_cancel_retries(mut self, retries: u32) -> Self {
        self.max_cancel_retries = retries;
        self
    }

    /// Set the base retry backoff
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the credentials provider
    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}
