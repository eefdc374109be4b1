//! Storage trait implementations for [`InMemoryBannerStorage`].

use async_trait::async_trait;
use banner_storage::{
    Banner, BannerDeleter, BannerPatch, BannerQuery, BannerReader, BannerWriter, NewBanner,
    StorageError,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::storage::{InMemoryBannerStorage, ensure_unique, normalize_tags};

#[async_trait]
impl BannerReader for InMemoryBannerStorage {
    async fn find_one(
        &self,
        feature_id: i64,
        tag_id: i64,
        _use_latest: bool,
    ) -> Result<Banner, StorageError> {
        let data = self.data.read().await;
        let mut matches = data.values().filter(|b| b.matches(feature_id, tag_id));

        let first = matches
            .next()
            .ok_or_else(|| StorageError::not_found_by_feature_tag(feature_id, tag_id))?;
        if matches.next().is_some() {
            return Err(StorageError::not_unique(feature_id, tag_id));
        }
        Ok(first.clone())
    }

    async fn find_many(&self, query: &BannerQuery) -> Result<Vec<Banner>, StorageError> {
        let data = self.data.read().await;
        let banners = data
            .values()
            .filter(|b| query.accepts(b))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(banners)
    }
}

#[async_trait]
impl BannerDeleter for InMemoryBannerStorage {
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.remove(&id)
            .ok_or_else(|| StorageError::not_found_by_id(id))?;
        debug!(id, "banner deleted");
        Ok(())
    }

    async fn delete_by_feature_tag(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, b| !b.matches(feature_id, tag_id));
        debug!(
            feature_id,
            tag_id,
            deleted = before - data.len(),
            "banners deleted by feature and tag"
        );
        Ok(())
    }
}

#[async_trait]
impl BannerWriter for InMemoryBannerStorage {
    async fn create(&self, banner: NewBanner) -> Result<i64, StorageError> {
        let tag_ids = normalize_tags(banner.tag_ids)?;
        let mut data = self.data.write().await;
        ensure_unique(&data, None, banner.feature_id, &tag_ids)?;

        let id = self.next_id();
        let now = OffsetDateTime::now_utc();
        data.insert(
            id,
            Banner {
                id,
                title: banner.title,
                text: banner.text,
                url: banner.url,
                feature_id: banner.feature_id,
                tag_ids,
                is_active: banner.is_active,
                created_at: now,
                updated_at: now,
            },
        );
        debug!(id, feature_id = banner.feature_id, "banner created");
        Ok(id)
    }

    async fn update(&self, id: i64, patch: BannerPatch) -> Result<(), StorageError> {
        let tag_ids = patch.tag_ids.map(normalize_tags).transpose()?;
        let mut data = self.data.write().await;
        let current = data
            .get(&id)
            .ok_or_else(|| StorageError::not_found_by_id(id))?;

        let feature_id = patch.feature_id.unwrap_or(current.feature_id);
        let tags = tag_ids.as_deref().unwrap_or(&current.tag_ids);
        ensure_unique(&data, Some(id), feature_id, tags)?;

        let mut updated = current.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(text) = patch.text {
            updated.text = text;
        }
        if let Some(url) = patch.url {
            updated.url = url;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }
        if let Some(tag_ids) = tag_ids {
            updated.tag_ids = tag_ids;
        }
        updated.feature_id = feature_id;
        updated.updated_at = OffsetDateTime::now_utc();

        data.insert(id, updated);
        debug!(id, "banner updated");
        Ok(())
    }
}
