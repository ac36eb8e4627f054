//! Payment intent client
//!
//! Request functions for the payments API: create an intent, query its status,
//! cancel it, and fetch or download its QR code. Every operation returns a
//! [`Result`]; transport failures and non-2xx answers become
//! [`PaymentError::Transport`] values carrying the best message available
//! (server message, then transport error text, then a per-operation fallback).
//!
//! # Examples
//!
//! ```no_run
//! use rust_payintent::client::PaymentIntentClient;
//! use rust_payintent::types::{CheckoutItem, CheckoutPayload, ClientConfig};
//! use rust_decimal::Decimal;
//! use std::collections::HashMap;
//!
//! # async fn example() -> rust_payintent::Result<()> {
//! let client = PaymentIntentClient::in_memory(ClientConfig::new("https://api.example.com"))?;
//!
//! let checkout = CheckoutPayload::new(vec![CheckoutItem::new("sku-1", 1)]);
//! let created = client
//!     .create_intent(Decimal::new(4990, 2), "Order #1001", HashMap::new(), &checkout)
//!     .await?;
//!
//! let status = client.query_status(&created.intent.id).await?;
//! println!("Payment {} is {}", created.intent.id, status.status);
//!
//! // Safe to call again if the first attempt timed out: the same token is reused
//! client.cancel(&created.intent.id).await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::build_auth_headers;
use crate::idempotency::{cancel_scope, IdempotencyKeyStore};
use crate::poller::StatusSource;
use crate::storage::{InMemorySessionStorage, SessionStorage};
use crate::types::constants::{endpoints, headers, CACHE_BUSTER_PARAM};
use crate::types::{
    map_backend_status, CancelOutcome, CheckoutPayload, ClientConfig, CreateIntentRequest,
    CreatedIntent, QrArtifact, StatusQueryResult,
};
use crate::{PaymentError, Result};
use async_trait::async_trait;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use http::StatusCode;
use reqwest::{Client, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

mod response;
mod retry;

#[cfg(test)]
mod tests;

use response::{
    extract_payment, extract_qr_url, extract_redirect_url, extract_status, is_already_cancelled,
    parse_body, parse_body_lenient, response_failure, transport_failure,
};

/// Message returned when a checkout has nothing to pay for
pub const EMPTY_CHECKOUT_MESSAGE: &str =
    "Checkout data with items is required to create a payment intent";

/// Client for the payments API
#[derive(Clone)]
pub struct PaymentIntentClient {
    base_url: Url,
    client: Client,
    config: ClientConfig,
    idempotency: IdempotencyKeyStore,
}

impl std::fmt::Debug for PaymentIntentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntentClient")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish()
    }
}

impl PaymentIntentClient {
    /// Create a new client persisting idempotency tokens in `storage`
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        config.validate()?;

        // Join treats a base without a trailing slash as a file, not a directory
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let client = Client::builder()
            .build()
            .map_err(|e| PaymentError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            config,
            idempotency: IdempotencyKeyStore::new(storage),
        })
    }

    /// Create a client with process-lifetime in-memory token storage
    pub fn in_memory(config: ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(InMemorySessionStorage::new()))
    }

    /// Base URL of the payments API
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The idempotency store used for cancel requests
    pub fn idempotency(&self) -> &IdempotencyKeyStore {
        &self.idempotency
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Start a request carrying auth and correlation headers
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(build_auth_headers(self.config.auth.as_ref()))
            .header(headers::REQUEST_ID, uuid::Uuid::new_v4().to_string())
    }

    /// Send a request and return the body of a 2xx answer, normalizing every failure
    async fn send_text(&self, request: RequestBuilder, fallback: &str) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_failure(e, fallback))?;

        if !response.status().is_success() {
            return Err(response_failure(response, fallback).await);
        }

        response
            .text()
            .await
            .map_err(|e| transport_failure(e, fallback))
    }

    /// Send a request expecting a JSON body
    async fn send_json(&self, request: RequestBuilder, fallback: &str) -> Result<Value> {
        let text = self.send_text(request, fallback).await?;
        parse_body(&text)
    }

    /// Create a payment intent
    ///
    /// Fails with a validation error, without touching the network, when the
    /// checkout carries no line items.
    pub async fn create_intent(
        &self,
        amount: Decimal,
        description: &str,
        metadata: HashMap<String, Value>,
        checkout: &CheckoutPayload,
    ) -> Result<CreatedIntent> {
        if checkout.is_empty() {
            return Err(PaymentError::validation(EMPTY_CHECKOUT_MESSAGE));
        }

        let body = CreateIntentRequest {
            amount,
            description: description.to_string(),
            metadata,
            checkout_data: checkout.clone(),
        };

        tracing::debug!(%amount, items = checkout.items.len(), "Creating payment intent");

        let url = self.endpoint(endpoints::PAYMENT_INTENTS)?;
        let request = self
            .request(Method::POST, url)
            .timeout(self.config.timeout)
            .json(&body);

        let raw = self
            .send_json(request, "Failed to create payment intent")
            .await
            .inspect_err(|e| tracing::error!("Payment intent creation failed: {}", e))?;

        let intent = extract_payment(&raw).ok_or_else(|| {
            PaymentError::invalid_response("Create response did not contain a payment intent")
        })?;
        let redirect_url = extract_redirect_url(&raw);

        tracing::info!(payment_id = %intent.id, status = %intent.status, "Payment intent created");

        Ok(CreatedIntent {
            intent,
            redirect_url,
            raw,
        })
    }

    /// Fetch the current status of a payment, bypassing any caches
    pub async fn query_status(&self, payment_id: &str) -> Result<StatusQueryResult> {
        let url = self.endpoint(&endpoints::status(payment_id))?;
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();

        let request = self
            .request(Method::GET, url)
            .timeout(self.config.status_timeout)
            .query(&[(CACHE_BUSTER_PARAM, cache_buster.as_str())])
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");

        let raw = self
            .send_json(request, "Failed to fetch payment status")
            .await?;

        let payment = extract_payment(&raw);
        let status = match extract_status(&raw) {
            Some(status) => map_backend_status(status),
            None => payment
                .as_ref()
                .map(|p| p.status.clone())
                .ok_or_else(|| {
                    PaymentError::invalid_response("Status response did not contain a status")
                })?,
        };

        tracing::debug!(payment_id, %status, "Fetched payment status");

        Ok(StatusQueryResult {
            status,
            payment,
            raw,
        })
    }

    /// Cancel a payment exactly once
    ///
    /// The request carries an idempotency token scoped to this payment. Any 2xx
    /// answer, including "already cancelled" or a non-JSON ack, clears the token. On failure the
    /// token is kept, so the next call retries the same logical cancel.
    pub async fn cancel(&self, payment_id: &str) -> Result<CancelOutcome> {
        let scope = cancel_scope(payment_id);
        let token = self.idempotency.get_or_create(&scope).await?;
        let url = self.endpoint(&endpoints::cancel(payment_id))?;

        let result = retry::retry_with_backoff(
            "Cancel payment",
            self.config.max_cancel_retries,
            self.config.retry_base_delay,
            |attempt| {
                tracing::debug!(payment_id, attempt, scope = %scope, "Sending cancel request");
                let request = self
                    .request(Method::POST, url.clone())
                    .timeout(self.config.timeout)
                    .header(headers::IDEMPOTENCY_KEY, token.as_str());
                self.send_text(request, "Failed to cancel payment")
            },
        )
        .await
        .map(parse_body_lenient);

        match result {
            Ok(raw) => {
                // The cancel already happened server-side; a stale token only
                // costs one deduplicated request later
                if let Err(e) = self.idempotency.clear(&scope).await {
                    tracing::warn!(payment_id, "Failed to clear idempotency token: {}", e);
                }
                let already_cancelled = is_already_cancelled(&raw);
                if already_cancelled {
                    tracing::info!(payment_id, "Payment was already cancelled");
                } else {
                    tracing::info!(payment_id, "Payment cancelled");
                }
                Ok(CancelOutcome {
                    payment_id: payment_id.to_string(),
                    already_cancelled,
                    raw,
                })
            }
            Err(e) => {
                tracing::error!(payment_id, "Cancel failed, keeping idempotency token: {}", e);
                Err(e)
            }
        }
    }

    /// Look up the QR code URL for a processor intent id
    ///
    /// `Ok(None)` when the server has no QR code for it.
    pub async fn fetch_qr_url(&self, payment_intent_id: &str) -> Result<Option<String>> {
        let url = self.endpoint(&endpoints::qr(payment_intent_id))?;
        let request = self
            .request(Method::GET, url)
            .timeout(self.config.status_timeout);

        match self.send_json(request, "Failed to fetch QR code").await {
            Ok(raw) => Ok(extract_qr_url(&raw)),
            Err(e) if e.status_code() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Download the QR image for a payment
    ///
    /// `Ok(None)` when there is no image to download.
    pub async fn download_qr(&self, payment_id: &str) -> Result<Option<QrArtifact>> {
        let fallback = "Failed to download QR code";
        let url = self.endpoint(&endpoints::qr_download(payment_id))?;
        let response = self
            .request(Method::GET, url)
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| transport_failure(e, fallback))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(response_failure(response, fallback).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_failure(e, fallback))?;

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(QrArtifact {
            bytes,
            content_type,
        }))
    }
}

#[async_trait]
impl StatusSource for PaymentIntentClient {
    async fn query_status(&self, payment_id: &str) -> Result<StatusQueryResult> {
        PaymentIntentClient::query_status(self, payment_id).await
    }
}
