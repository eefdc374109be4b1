//! In-memory banner storage backend.
//!
//! This crate provides an in-memory implementation of the storage traits from
//! `banner-storage`. Banners are kept ordered by id behind a tokio `RwLock`.
//!
//! # Example
//!
//! ```ignore
//! use banner_db_memory::InMemoryBannerStorage;
//! use banner_storage::{BannerReader, BannerWriter, NewBanner};
//!
//! let storage = InMemoryBannerStorage::new();
//! let id = storage.create(NewBanner::new("Spring sale", 42, vec![7])).await?;
//! let banner = storage.find_one(42, 7, false).await?;
//! assert_eq!(banner.id, id);
//! ```

mod banner_impl;
pub mod storage;

// Re-export the storage traits for convenience
pub use banner_storage::{BannerDeleter, BannerReader, BannerWriter, StorageError};

pub use storage::InMemoryBannerStorage;
