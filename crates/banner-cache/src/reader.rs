//! Cache-aside decorator over a [`BannerReader`].
//!
//! ## Lookup Flow
//!
//! ```text
//! find_one(f, t, use_latest=false)
//!   → cache GET "f:t"
//!       Exists     → cached banner
//!       NotExists  → NotFound (negative cache hit)
//!       NotFound   → source of truth → detached cache SET → result
//!       error      → logged, handled like NotFound
//! ```
//!
//! `use_latest = true` skips the cache in both directions. Listing is never cached.
//!
//! The cache is not invalidated when a banner is updated or deleted by id, so a
//! cached lookup can be stale for up to one TTL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use banner_storage::{Banner, BannerQuery, BannerReader, StorageError};

use crate::cache::{CacheBackend, CacheItem, CacheKey, CacheStatus, get_item, set_item};
use crate::config::CacheConfig;

/// Timing of cache fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Lifetime of positive and negative entries.
    pub ttl: Duration,
    /// Upper bound for one detached cache write.
    pub write_timeout: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for ReaderSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// What gets stored per key: the banner for `Exists`, nothing for `NotExists`.
type BannerItem = CacheItem<Option<Banner>>;

/// Banner reader that answers single lookups from the shared cache.
pub struct CachedBannerReader<R> {
    inner: R,
    backend: Arc<dyn CacheBackend>,
    settings: ReaderSettings,
}

impl<R: BannerReader> CachedBannerReader<R> {
    pub fn new(inner: R, backend: Arc<dyn CacheBackend>, settings: ReaderSettings) -> Self {
        Self {
            inner,
            backend,
            settings,
        }
    }

    /// Get a reference to the decorated reader.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn settings(&self) -> ReaderSettings {
        self.settings
    }

    /// Queries the source of truth and schedules a cache fill for the outcome.
    ///
    /// Errors other than `NotFound` are returned without touching the cache.
    async fn load_and_fill(&self, key: CacheKey) -> Result<Banner, StorageError> {
        let (result, item) = match self.inner.find_one(key.feature_id, key.tag_id, false).await {
            Ok(banner) => {
                let item = BannerItem::exists(Some(banner.clone()));
                (Ok(banner), item)
            }
            Err(e) if e.is_not_found() => (Err(e), BannerItem::not_exists()),
            Err(e) => return Err(e),
        };

        self.spawn_fill(key, item);
        result
    }

    /// Writes the item on its own task and timeout.
    ///
    /// The caller does not wait for it and cancelling the caller does not cancel
    /// the write. Failures are logged and dropped.
    fn spawn_fill(&self, key: CacheKey, item: BannerItem) {
        let backend = Arc::clone(&self.backend);
        let ReaderSettings { ttl, write_timeout } = self.settings;

        tokio::spawn(async move {
            let key = key.to_string();
            let write = set_item(backend.as_ref(), &key, &item, ttl);
            match tokio::time::timeout(write_timeout, write).await {
                Ok(Ok(())) => {
                    tracing::debug!(key = %key, status = ?item.status, "cache filled");
                }
                Ok(Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "cache set error");
                }
                Err(_) => {
                    tracing::warn!(
                        key = %key,
                        timeout_ms = write_timeout.as_millis() as u64,
                        "cache set timed out"
                    );
                }
            }
        });
    }
}

#[async_trait]
impl<R: BannerReader> BannerReader for CachedBannerReader<R> {
    async fn find_one(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, StorageError> {
        if use_latest {
            return self.inner.find_one(feature_id, tag_id, true).await;
        }

        let key = CacheKey::new(feature_id, tag_id);
        let cached = match get_item::<Option<Banner>>(self.backend.as_ref(), &key.to_string()).await
        {
            Ok(item) => item,
            Err(e) => {
                tracing::error!(
                    key = %key,
                    backend = self.backend.backend_name(),
                    error = %e,
                    "cache get error, falling back to storage"
                );
                return self.load_and_fill(key).await;
            }
        };

        match (cached.status, cached.value) {
            (CacheStatus::Exists, Some(banner)) => Ok(banner),
            (CacheStatus::Exists, None) => {
                tracing::warn!(key = %key, "cached entry marked existing without a value");
                self.load_and_fill(key).await
            }
            (CacheStatus::NotExists, _) => {
                tracing::debug!(key = %key, "negative cache hit");
                Err(StorageError::not_found_by_feature_tag(feature_id, tag_id))
            }
            (CacheStatus::NotFound, _) => self.load_and_fill(key).await,
        }
    }

    async fn find_many(&self, query: &BannerQuery) -> Result<Vec<Banner>, StorageError> {
        self.inner.find_many(query).await
    }
}
