//! Error types for the catalog
//!
//! Two families:
//! - [`ValidationError`]: malformed or out-of-range input, never mutates state
//! - [`CatalogError`]: anything that can go wrong while touching durable storage

use std::path::PathBuf;

/// Input rejected before it reaches the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task argument is missing or not a plain decimal number
    #[error("malformed task number: {0:?}")]
    MalformedTask(String),

    /// Task number parsed but lies outside the fixed range
    #[error("task number {0} is outside 1..=19")]
    TaskOutOfRange(u64),

    /// Media kind is not one of document, video or audio
    #[error("unrecognized media kind: {0:?}")]
    UnknownMediaKind(String),

    /// Media item arrived without a platform file id
    #[error("media item has no file id")]
    MissingExternalId,
}

/// Catalog storage errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Invalid input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading or staging the data file failed
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Catalog could not be encoded
    #[error("failed to encode catalog: {0}")]
    Encode(#[from] serde_json::Error),

    /// Staged file could not replace the data file
    #[error("failed to replace {}: {source}", path.display())]
    Persist {
        /// Destination data file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Check if error is caused by caller input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if error came from durable storage
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Persist { .. } | Self::Encode(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
