//! Session-scoped key-value storage
//!
//! Idempotency tokens must survive a retry, and even a restart of the calling
//! component, but they should not outlive the session that created them. This
//! module provides the storage abstraction the
//! [`IdempotencyKeyStore`](crate::idempotency::IdempotencyKeyStore) writes to.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key-value storage with session lifetime
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage implementation
///
/// Lives as long as the process, which is the session for a CLI or a service
/// worker. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySessionStorage {
    /// Create a new in-memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}


#[cfg(feature = "redis")]
pub mod redis_storage {
    use super::{Result, SessionStorage};
    use crate::types::constants::DEFAULT_SESSION_TTL;
    use crate::PaymentError;
    use redis::{AsyncCommands, Client};
    use std::time::Duration;

    /// Redis-based storage implementation
    ///
    /// Every write carries a TTL so tokens of abandoned operations expire with
    /// the session instead of accumulating.
    #[derive(Debug, Clone)]
    pub struct RedisSessionStorage {
        client: Client,
        key_prefix: String,
        ttl: Duration,
    }

    impl RedisSessionStorage {
        /// Create a new Redis storage instance
        ///
        /// # Arguments
        ///
        /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
        /// * `key_prefix` - Optional prefix for Redis keys (default: "payintent:session:")
        pub async fn new(redis_url: &str, key_prefix: Option<&str>) -> Result<Self> {
            let client = Client::open(redis_url).map_err(|e| {
                PaymentError::storage(format!("Failed to connect to Redis: {}", e))
            })?;

            let key_prefix = key_prefix.unwrap_or("payintent:session:").to_string();

            Ok(Self {
                client,
                key_prefix,
                ttl: DEFAULT_SESSION_TTL,
            })
        }

        /// Set the session lifetime of written keys
        pub fn with_ttl(mut self, ttl: Duration) -> Self {
            self.ttl = ttl;
            self
        }

        fn make_key(&self, key: &str) -> String {
            format!("{}{}", self.key_prefix, key)
        }

        async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| {
                    PaymentError::storage(format!("Failed to get Redis connection: {}", e))
                })
        }
    }

    #[async_trait::async_trait]
    impl SessionStorage for RedisSessionStorage {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(self.make_key(key)).await.map_err(|e| {
                PaymentError::storage(format!("Redis GET command failed: {}", e))
            })?;
            Ok(value)
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(self.make_key(key), value, self.ttl.as_secs().max(1))
                .await
                .map_err(|e| PaymentError::storage(format!("Redis SET command failed: {}", e)))?;
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(self.make_key(key))
                .await
                .map_err(|e| PaymentError::storage(format!("Redis DEL command failed: {}", e)))?;
            Ok(())
        }
    }

}
