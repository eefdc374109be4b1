//! Cache-aside banner lookups with negative caching, and delete-by-feature-tag
//! propagation over a shared pub/sub channel.
//!
//! ```text
//! lookup ──▶ CachedBannerReader ──▶ cache GET ──hit──▶ banner / NotFound
//!                    │ miss/error
//!                    ▼
//!              source of truth ──▶ detached cache SET (TTL)
//!
//! request_delete ──▶ PUBLISH ──▶ every instance's listener ──▶ local delete
//! ```

pub mod cache;
pub mod config;
pub mod observability;
pub mod propagator;
pub mod reader;
pub mod service;

use std::sync::Arc;

pub use cache::{
    CacheBackend, CacheError, CacheItem, CacheKey, CacheStatus, LocalCacheBackend,
    RedisCacheBackend,
};
pub use config::{AppConfig, CacheConfig, DeleteChannelConfig, LoggingConfig, RedisConfig};
pub use observability::{init_tracing, init_tracing_with_level, set_log_level};
pub use propagator::{
    DeleteMessage, DeletePropagator, ListenerExit, ListenerState, PropagatorSettings,
};
pub use reader::{CachedBannerReader, ReaderSettings};
pub use service::{BannerError, BannerService, BannerServiceBuilder};

/// Create a cache backend based on configuration.
///
/// ## Cache Modes
///
/// - **Redis disabled**: Returns the local backend (single instance)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local on failure
///
/// ## Graceful Degradation
///
/// If the Redis connection fails, the service still starts and runs with a
/// per-instance cache and per-instance delete propagation.
pub async fn create_cache_backend(config: &RedisConfig) -> Arc<dyn CacheBackend> {
    use std::time::Duration;

    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return Arc::new(LocalCacheBackend::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    // Create Redis pool configuration
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
    redis_config.pool = Some(pool_config);

    // Create pool
    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(LocalCacheBackend::new());
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis successfully");
            Arc::new(RedisCacheBackend::new(pool, config.url.clone()))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            Arc::new(LocalCacheBackend::new())
        }
    }
}
