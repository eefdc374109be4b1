use banner_storage::{Banner, StorageError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// In-memory banner storage ordered by id.
///
/// This storage implementation provides:
/// - Ordered iteration by primary key (listing order matches a relational store)
/// - (feature, tag) uniqueness enforcement on create and update
/// - Concurrent readers via a tokio `RwLock`
#[derive(Debug)]
pub struct InMemoryBannerStorage {
    /// Banners keyed by id
    pub(crate) data: RwLock<BTreeMap<i64, Banner>>,
    /// Atomic counter for generating ids
    next_id: AtomicI64,
}

impl InMemoryBannerStorage {
    /// Creates a new, empty storage.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Generates the next banner id.
    pub(crate) fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of stored banners.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Returns true if no banners are stored.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

impl Default for InMemoryBannerStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that no banner other than `exclude_id` already owns one of the pairs.
pub(crate) fn ensure_unique(
    data: &BTreeMap<i64, Banner>,
    exclude_id: Option<i64>,
    feature_id: i64,
    tag_ids: &[i64],
) -> Result<(), StorageError> {
    for banner in data.values() {
        if Some(banner.id) == exclude_id || banner.feature_id != feature_id {
            continue;
        }
        if let Some(tag_id) = tag_ids.iter().find(|t| banner.tag_ids.contains(t)) {
            return Err(StorageError::already_exists(feature_id, *tag_id));
        }
    }
    Ok(())
}

/// Rejects banners without tags and normalizes the tag list.
pub(crate) fn normalize_tags(mut tag_ids: Vec<i64>) -> Result<Vec<i64>, StorageError> {
    if tag_ids.is_empty() {
        return Err(StorageError::invalid_banner("banner must have at least one tag"));
    }
    tag_ids.sort_unstable();
    tag_ids.dedup();
    Ok(tag_ids)
}
