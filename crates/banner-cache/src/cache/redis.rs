//! Shared cache backend on Redis.
//!
//! Key/value commands go through a `deadpool-redis` pool. Pub/sub needs a
//! dedicated connection (a subscribed connection cannot run other commands), so
//! every subscription opens its own client connection.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use futures_util::StreamExt;
use redis::AsyncCommands;

use super::backend::{CacheBackend, CacheError, ChannelMessage, MessageStream};

/// Redis-backed cache shared by every serving instance.
#[derive(Clone)]
pub struct RedisCacheBackend {
    pool: Pool,
    redis_url: String,
}

impl RedisCacheBackend {
    /// Create a backend from a connection pool and the URL used for pub/sub connections.
    pub fn new(pool: Pool, redis_url: impl Into<String>) -> Self {
        Self {
            pool,
            redis_url: redis_url.into(),
        }
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let data = conn
            .get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| CacheError::Command(format!("GET {key}: {e}")))?;

        match data {
            Some(_) => tracing::debug!(key = %key, "cache hit (redis)"),
            None => tracing::debug!(key = %key, "cache miss (redis)"),
        }
        Ok(data)
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // PSETEX rejects a zero expiry
        let ttl_ms = u64::try_from(ttl.as_millis())
            .map_err(|_| CacheError::Command(format!("PSETEX {key}: ttl {ttl:?} out of range")))?
            .max(1);
        conn.pset_ex::<_, _, ()>(key, payload, ttl_ms)
            .await
            .map_err(|e| CacheError::Command(format!("PSETEX {key}: {e}")))?;

        tracing::debug!(key = %key, ttl_ms, "cache set (redis)");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let receivers: usize = conn
            .publish(channel, payload)
            .await
            .map_err(|e| CacheError::Command(format!("PUBLISH {channel}: {e}")))?;

        tracing::debug!(channel = %channel, receivers, "published message (redis)");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, CacheError> {
        // Create a dedicated Redis client for pub/sub
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| CacheError::Subscribe(e.to_string()))?;

        tracing::info!(channel = %channel, "subscribed to redis channel");

        let stream = pubsub.into_on_message().map(|msg| {
            ChannelMessage::new(msg.get_channel_name(), msg.get_payload_bytes().to_vec())
        });
        Ok(stream.boxed())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
