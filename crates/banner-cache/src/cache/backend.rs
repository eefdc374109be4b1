//! Key/value cache backend contract shared by every serving instance.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::item::CacheItem;

/// A message received on a pub/sub channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl ChannelMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Stream of messages published after the subscription was established.
///
/// The stream ending means the backend connection closed.
pub type MessageStream = BoxStream<'static, ChannelMessage>;

/// Remote, TTL-capable key/value store with a publish/subscribe primitive.
///
/// A missing key is `Ok(None)`, never an error: errors are reserved for
/// connectivity and protocol failures so callers can tell "no entry" apart
/// from "cache unavailable".
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the stored payload, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores a payload with an expiration, overwriting any previous value.
    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Broadcasts a payload to every current subscriber of `channel`.
    ///
    /// Success means the backend accepted the message, not that anyone received it.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError>;

    /// Subscribes to `channel`.
    ///
    /// The subscription is active once this returns; earlier messages are not replayed.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, CacheError>;

    /// Name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

/// Errors raised by cache backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Cache command error: {0}")]
    Command(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Reads and decodes a cache item.
///
/// A missing key yields a synthetic item with [`CacheStatus::NotFound`](super::CacheStatus::NotFound)
/// and a default value; that status is never written back.
pub async fn get_item<T>(backend: &dyn CacheBackend, key: &str) -> Result<CacheItem<T>, CacheError>
where
    T: DeserializeOwned + Default,
{
    match backend.get(key).await? {
        Some(data) => rmp_serde::from_slice(&data)
            .map_err(|e| CacheError::Deserialization(format!("{key}: {e}"))),
        None => Ok(CacheItem::not_found()),
    }
}

/// Encodes and stores a cache item as a MessagePack `{value, status}` map.
pub async fn set_item<T>(
    backend: &dyn CacheBackend,
    key: &str,
    item: &CacheItem<T>,
    ttl: Duration,
) -> Result<(), CacheError>
where
    T: Serialize + Sync,
{
    let data = rmp_serde::to_vec_named(item)
        .map_err(|e| CacheError::Serialization(format!("{key}: {e}")))?;
    backend.set(key, data, ttl).await
}
