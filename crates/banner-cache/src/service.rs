//! Banner service facade used by the transport layer.
//!
//! Wires the cache-aside reader and the delete propagator around one source of
//! truth and maps storage errors to the small set callers need to distinguish.

use std::sync::Arc;

use banner_storage::{
    Banner, BannerDeleter, BannerPatch, BannerQuery, BannerReader, BannerWriter, NewBanner,
    StorageError,
};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheBackend, CacheError};
use crate::config::AppConfig;
use crate::propagator::{DeletePropagator, ListenerExit, ListenerState, PropagatorSettings};
use crate::reader::{CachedBannerReader, ReaderSettings};

/// Errors surfaced to callers of [`BannerService`].
#[derive(Debug, thiserror::Error)]
pub enum BannerError {
    #[error("banner not found")]
    NotFound,

    #[error("banner not unique")]
    NotUnique,

    #[error("banner already exists")]
    AlreadyExists,

    #[error("banner is not active")]
    NotActive,

    #[error("invalid banner: {0}")]
    Invalid(String),

    #[error("unknown error")]
    Unknown,
}

impl BannerError {
    /// Maps a storage error, logging the detail that the caller will not see.
    fn from_storage(err: StorageError, operation: &'static str) -> Self {
        match err {
            StorageError::NotFound { lookup } => {
                tracing::info!(operation, %lookup, "banner not found");
                Self::NotFound
            }
            StorageError::NotUnique { feature_id, tag_id } => {
                tracing::info!(operation, feature_id, tag_id, "banner not unique");
                Self::NotUnique
            }
            StorageError::AlreadyExists { feature_id, tag_id } => {
                tracing::info!(operation, feature_id, tag_id, "banner already exists");
                Self::AlreadyExists
            }
            StorageError::InvalidBanner { message } => Self::Invalid(message),
            other => {
                tracing::error!(
                    operation,
                    category = %other.category(),
                    error = %other,
                    "banner storage failure"
                );
                Self::Unknown
            }
        }
    }
}

/// Caller-facing banner operations.
pub struct BannerService<S: ?Sized> {
    reader: CachedBannerReader<Arc<S>>,
    deleter: DeletePropagator<S>,
    writer: Arc<S>,
    backend: Arc<dyn CacheBackend>,
    shutdown: CancellationToken,
}

impl<S> BannerService<S>
where
    S: BannerReader + BannerDeleter + BannerWriter + ?Sized + 'static,
{
    /// Single banner for a (feature, tag) pair, served from cache unless `use_latest`.
    pub async fn lookup(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, BannerError> {
        self.reader
            .find_one(feature_id, tag_id, use_latest)
            .await
            .map_err(|e| BannerError::from_storage(e, "lookup"))
    }

    /// Like [`lookup`](Self::lookup), but disabled banners are hidden from regular users.
    pub async fn lookup_for_user(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, BannerError> {
        let banner = self.lookup(feature_id, tag_id, use_latest).await?;
        if !banner.is_active {
            tracing::info!(id = banner.id, "banner not active, restricting user access");
            return Err(BannerError::NotActive);
        }
        Ok(banner)
    }

    /// Filtered listing, always answered by the source of truth.
    pub async fn list_by_feature_tag(&self, query: &BannerQuery) -> Result<Vec<Banner>, BannerError> {
        self.reader
            .find_many(query)
            .await
            .map_err(|e| BannerError::from_storage(e, "list_by_feature_tag"))
    }

    /// Synchronous delete by id. Cached lookups of this banner expire with their TTL.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), BannerError> {
        self.deleter
            .delete_by_id(id)
            .await
            .map_err(|e| BannerError::from_storage(e, "delete_by_id"))
    }

    /// Queues a delete of every banner for (feature, tag) on all instances.
    ///
    /// Returns as soon as the request is published; confirm with a later read.
    pub async fn request_delete_by_feature_tag(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<(), BannerError> {
        self.deleter
            .request_delete(feature_id, tag_id)
            .await
            .map_err(|_| BannerError::Unknown)
    }

    pub async fn create(&self, banner: NewBanner) -> Result<i64, BannerError> {
        tracing::info!(title = %banner.title, feature_id = banner.feature_id, "saving banner");
        self.writer
            .create(banner)
            .await
            .map_err(|e| BannerError::from_storage(e, "create"))
    }

    /// Partial update. Does not invalidate cached lookups.
    pub async fn update(&self, id: i64, patch: BannerPatch) -> Result<(), BannerError> {
        tracing::info!(id, "updating banner");
        self.writer
            .update(id, patch)
            .await
            .map_err(|e| BannerError::from_storage(e, "update"))
    }

    pub fn listener_state(&self) -> ListenerState {
        self.deleter.listener_state()
    }

    pub async fn listener_stopped(&self) -> ListenerExit {
        self.deleter.listener_stopped().await
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Stops the delete listener. Pending cache writes and deletes still finish.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Builder for [`BannerService`].
///
/// # Example
///
/// ```ignore
/// let service = BannerServiceBuilder::new()
///     .with_config(cfg)
///     .build(Arc::new(InMemoryBannerStorage::new()))
///     .await?;
/// let banner = service.lookup(42, 7, false).await?;
/// ```
#[derive(Default)]
pub struct BannerServiceBuilder {
    config: AppConfig,
    backend: Option<Arc<dyn CacheBackend>>,
    shutdown: Option<CancellationToken>,
}

impl BannerServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing backend instead of connecting from `config.redis`.
    pub fn with_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Tie the delete listener to an outer cancellation scope.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Connects the backend (unless one was given) and starts the delete listener.
    pub async fn build<S>(self, storage: Arc<S>) -> Result<BannerService<S>, CacheError>
    where
        S: BannerReader + BannerDeleter + BannerWriter + ?Sized + 'static,
    {
        let backend = match self.backend {
            Some(backend) => backend,
            None => crate::create_cache_backend(&self.config.redis).await,
        };
        let shutdown = self.shutdown.unwrap_or_default();

        let reader = CachedBannerReader::new(
            Arc::clone(&storage),
            Arc::clone(&backend),
            ReaderSettings::from(&self.config.cache),
        );
        let deleter = DeletePropagator::start(
            Arc::clone(&backend),
            Arc::clone(&storage),
            PropagatorSettings::from(&self.config.delete_channel),
            shutdown.clone(),
        )
        .await?;

        tracing::info!(
            backend = backend.backend_name(),
            ttl_secs = self.config.cache.ttl_secs,
            channel = %self.config.delete_channel.channel,
            "banner service ready"
        );

        Ok(BannerService {
            reader,
            deleter,
            writer: storage,
            backend,
            shutdown,
        })
    }
}
