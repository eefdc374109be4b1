//! # banner-storage
//!
//! Storage abstraction layer for the banner source of truth.
//!
//! This crate defines the traits and types that every source-of-truth backend
//! implements. It does not contain any implementations; those live in separate
//! crates (`banner-db-memory`) or in the embedding application.
//!
//! ## Overview
//!
//! The store is split by capability:
//! - [`BannerReader`]: single lookup by (feature, tag) and filtered listing
//! - [`BannerDeleter`]: delete by id and delete by (feature, tag)
//! - [`BannerWriter`]: create and partial update
//!
//! Decorators such as the cache-aside reader implement the same trait they wrap,
//! so they can be stacked without the caller noticing.

mod error;
mod traits;
mod types;

pub use error::{BannerLookup, ErrorCategory, StorageError};
pub use traits::{BannerDeleter, BannerReader, BannerWriter};
pub use types::{Banner, BannerPatch, BannerQuery, NewBanner};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use banner_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{BannerLookup, ErrorCategory, StorageError};
    pub use crate::traits::{BannerDeleter, BannerReader, BannerWriter};
    pub use crate::types::{Banner, BannerPatch, BannerQuery, NewBanner};
    pub use crate::StorageResult;
}
