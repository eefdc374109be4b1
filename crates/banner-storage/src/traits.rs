//! Storage traits for the banner storage abstraction layer.
//!
//! Each capability of the source of truth is its own trait so that decorators
//! (caching, delete propagation) can wrap exactly the capability they change.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{Banner, BannerPatch, BannerQuery, NewBanner};

/// Read access to banners.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use banner_storage::{BannerReader, StorageError};
///
/// async fn title(reader: &dyn BannerReader) -> Result<String, StorageError> {
///     Ok(reader.find_one(42, 7, false).await?.title)
/// }
/// ```
#[async_trait]
pub trait BannerReader: Send + Sync {
    /// Finds the single banner served for a (feature, tag) pair.
    ///
    /// `use_latest` asks for the most recent revision, bypassing any caching
    /// layer between the caller and the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no banner matches.
    /// Returns `StorageError::NotUnique` if more than one banner matches.
    async fn find_one(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, StorageError>;

    /// Lists banners matching the optional filters, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues; no match is an empty list.
    async fn find_many(&self, query: &BannerQuery) -> Result<Vec<Banner>, StorageError>;
}

/// Delete access to banners.
#[async_trait]
pub trait BannerDeleter: Send + Sync {
    /// Deletes a banner by primary key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the banner does not exist.
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError>;

    /// Deletes every banner served for a (feature, tag) pair.
    ///
    /// Deleting nothing is not an error.
    async fn delete_by_feature_tag(&self, feature_id: i64, tag_id: i64)
    -> Result<(), StorageError>;
}

/// Write access to banners.
#[async_trait]
pub trait BannerWriter: Send + Sync {
    /// Creates a banner and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if another banner already owns one
    /// of the (feature, tag) pairs.
    /// Returns `StorageError::InvalidBanner` if the banner has no tags.
    async fn create(&self, banner: NewBanner) -> Result<i64, StorageError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the banner does not exist.
    /// Returns `StorageError::AlreadyExists` if the update collides with another banner.
    async fn update(&self, id: i64, patch: BannerPatch) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: BannerReader + ?Sized> BannerReader for Arc<T> {
    async fn find_one(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, StorageError> {
        (**self).find_one(feature_id, tag_id, use_latest).await
    }

    async fn find_many(&self, query: &BannerQuery) -> Result<Vec<Banner>, StorageError> {
        (**self).find_many(query).await
    }
}

#[async_trait]
impl<T: BannerDeleter + ?Sized> BannerDeleter for Arc<T> {
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        (**self).delete_by_id(id).await
    }

    async fn delete_by_feature_tag(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<(), StorageError> {
        (**self).delete_by_feature_tag(feature_id, tag_id).await
    }
}

#[async_trait]
impl<T: BannerWriter + ?Sized> BannerWriter for Arc<T> {
    async fn create(&self, banner: NewBanner) -> Result<i64, StorageError> {
        (**self).create(banner).await
    }

    async fn update(&self, id: i64, patch: BannerPatch) -> Result<(), StorageError> {
        (**self).update(id, patch).await
    }
}
