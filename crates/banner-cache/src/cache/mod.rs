//! Shared key/value cache with publish/subscribe.
//!
//! ## Backends
//!
//! - **Local (DashMap + broadcast)**: in-process, for single-instance deployments and tests
//! - **Redis**: shared across instances, TTL handled by the server
//!
//! ## Graceful Degradation
//!
//! The cache is an optimisation, not a dependency. Backend failures are returned
//! as [`CacheError`] and callers fall back to the source of truth; if Redis is
//! unreachable at startup, [`create_cache_backend`](crate::create_cache_backend)
//! falls back to the local backend.

pub mod backend;
pub mod item;
pub mod local;
pub mod redis;

pub use self::backend::{
    CacheBackend, CacheError, ChannelMessage, MessageStream, get_item, set_item,
};
pub use self::item::{CacheItem, CacheKey, CacheStatus};
pub use self::local::{CachedEntry, LocalCacheBackend};
pub use self::redis::RedisCacheBackend;
