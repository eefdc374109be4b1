//! Storage error types for the banner storage abstraction layer.
//!
//! This module defines all error types that can occur during storage operations.

use std::fmt;

/// Identifies the banner a failed operation was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BannerLookup {
    /// Lookup by primary key.
    Id(i64),
    /// Lookup by the (feature, tag) pair.
    FeatureTag {
        /// Feature identifier.
        feature_id: i64,
        /// Tag identifier.
        tag_id: i64,
    },
}

impl fmt::Display for BannerLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::FeatureTag { feature_id, tag_id } => {
                write!(f, "feature_id={feature_id}, tag_id={tag_id}")
            }
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested banner was not found.
    #[error("Banner not found: {lookup}")]
    NotFound {
        /// What the caller was looking for.
        lookup: BannerLookup,
    },

    /// More than one banner matched a lookup expected to be singular.
    #[error("Banner not unique: feature_id={feature_id}, tag_id={tag_id}")]
    NotUnique {
        /// Feature identifier of the lookup.
        feature_id: i64,
        /// Tag identifier of the lookup.
        tag_id: i64,
    },

    /// A banner already owns the given (feature, tag) pair.
    #[error("Banner already exists: feature_id={feature_id}, tag_id={tag_id}")]
    AlreadyExists {
        /// Feature identifier of the conflicting pair.
        feature_id: i64,
        /// Tag identifier of the conflicting pair.
        tag_id: i64,
    },

    /// The banner data is invalid.
    #[error("Invalid banner: {message}")]
    InvalidBanner {
        /// Description of why the banner is invalid.
        message: String,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a `NotFound` error for a lookup by id.
    #[must_use]
    pub fn not_found_by_id(id: i64) -> Self {
        Self::NotFound {
            lookup: BannerLookup::Id(id),
        }
    }

    /// Creates a `NotFound` error for a lookup by (feature, tag).
    #[must_use]
    pub fn not_found_by_feature_tag(feature_id: i64, tag_id: i64) -> Self {
        Self::NotFound {
            lookup: BannerLookup::FeatureTag { feature_id, tag_id },
        }
    }

    /// Creates a new `NotUnique` error.
    #[must_use]
    pub fn not_unique(feature_id: i64, tag_id: i64) -> Self {
        Self::NotUnique { feature_id, tag_id }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(feature_id: i64, tag_id: i64) -> Self {
        Self::AlreadyExists { feature_id, tag_id }
    }

    /// Creates a new `InvalidBanner` error.
    #[must_use]
    pub fn invalid_banner(message: impl Into<String>) -> Self {
        Self::InvalidBanner {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a not unique error.
    #[must_use]
    pub fn is_not_unique(&self) -> bool {
        matches!(self, Self::NotUnique { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::NotUnique { .. } => ErrorCategory::Conflict,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidBanner { .. } => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Banner not found.
    NotFound,
    /// Conflict (uniqueness).
    Conflict,
    /// Validation error.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
