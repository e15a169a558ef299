//! Error types shared by the filter, the estimator and the session owner.

use thiserror::Error;

/// Result alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, SketchError>;

/// Errors reported by sketch construction and item encoding.
///
/// Per-item operations never fail for items that have a canonical byte form,
/// so `UnencodableItem` is the only error an ingestion loop has to handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    /// A construction parameter is out of its valid range.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    InvalidConfiguration {
        parameter: &'static str,
        reason: String,
    },
    /// An item has no canonical UTF-8 byte form and cannot be hashed.
    #[error("item cannot be encoded to canonical bytes: {reason}")]
    UnencodableItem { reason: String },
    /// A session query was made before any dataset was loaded.
    #[error("no dataset loaded")]
    NoDatasetLoaded,
}

impl SketchError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        SketchError::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn unencodable(reason: impl Into<String>) -> Self {
        SketchError::UnencodableItem {
            reason: reason.into(),
        }
    }

    /// Return whether this error was raised while encoding an item
    #[inline]
    pub fn is_unencodable(&self) -> bool {
        matches!(self, SketchError::UnencodableItem { .. })
    }
}
