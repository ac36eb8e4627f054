//! Idempotency tokens for mutating requests
//!
//! A token is bound to one `(operation, resource)` scope, e.g.
//! `cancelPayment.<paymentId>`. Retries of the same logical attempt reuse the
//! token; once the server confirms the operation the token is cleared, so the
//! next attempt is a new logical operation with a fresh token.

use crate::storage::SessionStorage;
use crate::types::constants::CANCEL_PAYMENT_OPERATION;
use crate::Result;
use rand::RngCore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key prefix for idempotency tokens
const KEY_PREFIX: &str = "idempotency:";

/// Build the scope key for an operation on a resource
pub fn scope_key(operation: &str, resource_id: &str) -> String {
    format!("{}.{}", operation, resource_id)
}

/// Scope key used for cancelling a payment
pub fn cancel_scope(payment_id: &str) -> String {
    scope_key(CANCEL_PAYMENT_OPERATION, payment_id)
}

/// Generate a 128-bit random token, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and persists idempotency tokens
///
/// `get_or_create` and `clear` are the only mutations. Both are serialized, so
/// two callers racing on the same scope always observe one token.
#[derive(Clone)]
pub struct IdempotencyKeyStore {
    storage: Arc<dyn SessionStorage>,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for IdempotencyKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyKeyStore")
            .field("storage", &"<session storage>")
            .finish()
    }
}

impl IdempotencyKeyStore {
    /// Create a store over the given storage backend
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn storage_key(scope: &str) -> String {
        format!("{}{}", KEY_PREFIX, scope)
    }

    /// Return the token for `scope`, creating and persisting one if absent
    pub async fn get_or_create(&self, scope: &str) -> Result<String> {
        let _guard = self.lock.lock().await;
        let key = Self::storage_key(scope);

        if let Some(token) = self.storage.get(&key).await? {
            tracing::debug!(scope, "Reusing idempotency token");
            return Ok(token);
        }

        let token = generate_token();
        self.storage.set(&key, &token).await?;
        tracing::debug!(scope, "Issued new idempotency token");
        Ok(token)
    }

    /// Look up the token for `scope` without creating one
    pub async fn peek(&self, scope: &str) -> Result<Option<String>> {
        self.storage.get(&Self::storage_key(scope)).await
    }

    /// Remove the token for `scope` once the operation is confirmed
    pub async fn clear(&self, scope: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage.remove(&Self::storage_key(scope)).await?;
        tracing::debug!(scope, "Cleared idempotency token");
        Ok(())
    }
}
