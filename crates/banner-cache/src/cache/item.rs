//! Cache item envelope and key format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a cache item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// The value is a record fetched from the source of truth.
    Exists,
    /// There is no cache entry for the key. Only ever produced on read, never stored.
    NotFound,
    /// The source of truth was asked and has no such record (negative cache).
    NotExists,
}

/// Value stored in the cache together with its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> CacheItem<T> {
    pub fn new(value: T, status: CacheStatus) -> Self {
        Self { value, status }
    }

    pub fn exists(value: T) -> Self {
        Self::new(value, CacheStatus::Exists)
    }
}

impl<T: Default> CacheItem<T> {
    /// Confirmed negative entry.
    pub fn not_exists() -> Self {
        Self::new(T::default(), CacheStatus::NotExists)
    }

    /// Synthetic "no entry" item.
    pub fn not_found() -> Self {
        Self::new(T::default(), CacheStatus::NotFound)
    }
}

/// Cache key of a single banner lookup, rendered as `"<feature_id>:<tag_id>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub feature_id: i64,
    pub tag_id: i64,
}

impl CacheKey {
    pub fn new(feature_id: i64, tag_id: i64) -> Self {
        Self { feature_id, tag_id }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feature_id, self.tag_id)
    }
}
