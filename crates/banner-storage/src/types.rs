//! Storage types for the banner storage abstraction layer.
//!
//! This module defines all data types used by the storage traits.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A banner as stored in the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    /// Primary key.
    pub id: i64,
    /// Banner title.
    pub title: String,
    /// Banner body text.
    pub text: String,
    /// Target URL.
    pub url: String,
    /// Feature the banner belongs to.
    pub feature_id: i64,
    /// Tags the banner is shown for.
    pub tag_ids: Vec<i64>,
    /// Whether the banner is visible to regular users.
    pub is_active: bool,
    /// When the banner was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the banner was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Banner {
    /// Returns true if this banner is served for the given (feature, tag) pair.
    #[must_use]
    pub fn matches(&self, feature_id: i64, tag_id: i64) -> bool {
        self.feature_id == feature_id && self.tag_ids.contains(&tag_id)
    }
}

/// Input for creating a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBanner {
    pub title: String,
    pub text: String,
    pub url: String,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub is_active: bool,
}

impl NewBanner {
    /// Creates an active banner for a feature and a set of tags.
    #[must_use]
    pub fn new(title: impl Into<String>, feature_id: i64, tag_ids: Vec<i64>) -> Self {
        Self {
            title: title.into(),
            text: String::new(),
            url: String::new(),
            feature_id,
            tag_ids,
            is_active: true,
        }
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the target URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Partial update of a banner. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
    pub feature_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
    pub is_active: Option<bool>,
}

impl BannerPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.text.is_none()
            && self.url.is_none()
            && self.feature_id.is_none()
            && self.tag_ids.is_none()
            && self.is_active.is_none()
    }
}

/// Filter for listing banners. Every field is optional.
///
/// # Example
///
/// ```
/// use banner_storage::BannerQuery;
///
/// let query = BannerQuery::new().with_feature(42).with_limit(10);
/// assert_eq!(query.feature_id, Some(42));
/// assert_eq!(query.tag_id, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerQuery {
    pub feature_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub use_latest: Option<bool>,
}

impl BannerQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_feature(mut self, feature_id: i64) -> Self {
        self.feature_id = Some(feature_id);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag_id: i64) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_use_latest(mut self, use_latest: bool) -> Self {
        self.use_latest = Some(use_latest);
        self
    }

    /// Returns true if the banner passes the feature and tag filters.
    #[must_use]
    pub fn accepts(&self, banner: &Banner) -> bool {
        self.feature_id.is_none_or(|f| banner.feature_id == f)
            && self.tag_id.is_none_or(|t| banner.tag_ids.contains(&t))
    }
}
