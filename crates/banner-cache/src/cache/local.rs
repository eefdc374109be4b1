//! Single-instance cache backend: DashMap entries plus a tokio broadcast bus.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::backend::{CacheBackend, CacheError, ChannelMessage, MessageStream};

/// Default buffer size for the pub/sub bus.
/// Messages beyond this limit are dropped for slow subscribers.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Expiry used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A cached payload with its expiry deadline.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub expires_at: Instant,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self {
            data: Arc::new(data),
            expires_at,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process backend for single-instance deployments and tests.
///
/// Clones share the same entries and the same pub/sub bus, so two clones behave
/// like two instances connected to one shared server.
#[derive(Clone)]
pub struct LocalCacheBackend {
    entries: Arc<DashMap<String, CachedEntry>>,
    bus: broadcast::Sender<ChannelMessage>,
}

impl LocalCacheBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a backend whose pub/sub bus buffers `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        let (bus, _) = broadcast::channel(capacity);
        Self {
            entries: Arc::new(DashMap::new()),
            bus,
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of active subscriptions across all channels.
    pub fn subscriber_count(&self) -> usize {
        self.bus.receiver_count()
    }
}

impl Default for LocalCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for LocalCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                tracing::debug!(key = %key, "cache hit (local)");
                return Ok(Some(entry.data.as_ref().clone()));
            }
            // Remove expired entry
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired());
        }
        tracing::debug!(key = %key, "cache miss (local)");
        Ok(None)
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), CachedEntry::new(payload, ttl));
        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set (local)");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError> {
        // No subscribers is not an error, same as PUBLISH returning 0
        let receivers = self
            .bus
            .send(ChannelMessage::new(channel, payload))
            .unwrap_or_default();
        tracing::debug!(channel = %channel, receivers, "published message (local)");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, CacheError> {
        let channel = channel.to_string();
        let stream = BroadcastStream::new(self.bus.subscribe()).filter_map(move |result| {
            let message = match result {
                Ok(message) if message.channel == channel => Some(message),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %channel, skipped, "subscriber lagged, messages dropped");
                    None
                }
            };
            futures_util::future::ready(message)
        });
        Ok(stream.boxed())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
