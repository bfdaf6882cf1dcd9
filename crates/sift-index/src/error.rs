//! Error types for building, persisting, and querying indices.

use std::path::PathBuf;
use std::time::Duration;

use sift_core::RowId;
use thiserror::Error;

use crate::normalize::DegenerateVector;

/// Failures of the external embedding capability.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The embedding backend could not be reached or rejected the request.
    #[error("embedding request failed: {0}")]
    Request(String),

    /// The embedding backend did not answer in time.
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    /// The embedding backend answered with something that is not a vector
    /// per input text.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Errors raised while building, loading, saving, or searching an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector has zero (or non-finite) L2 norm and cannot be normalized.
    #[error(transparent)]
    Degenerate(#[from] DegenerateVector),

    /// A dataset row's name embeds to a degenerate vector. The build is
    /// aborted.
    #[error("row {row_id} ({name:?}) embeds to a degenerate vector")]
    DegenerateRow { row_id: RowId, name: String },

    /// No persisted index exists at the expected location.
    #[error("no index found at {}; build the index first", path.display())]
    NotFound { path: PathBuf },

    /// A persisted artifact failed structural validation.
    #[error("index artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The index was built from a different catalog than the one it would
    /// be joined with. Its row ids no longer name the same rows.
    #[error(
        "index was built from catalog snapshot {index:08x} but the catalog is now {catalog:08x}; rebuild the index"
    )]
    Stale { index: u32, catalog: u32 },

    /// The query vector's dimension differs from the index dimension. This
    /// usually means a different embedder was used at query time.
    #[error("dimension mismatch: index has {expected} dimensions, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedder returned vectors of different lengths for different rows.
    #[error("row {row_id} embeds to {actual} dimensions, earlier rows had {expected}")]
    InconsistentDimension {
        row_id: RowId,
        expected: usize,
        actual: usize,
    },

    /// The same row id was given twice.
    #[error("duplicate row id {0}")]
    DuplicateRowId(RowId),

    /// There are no rows to build an index from.
    #[error("cannot build an index from an empty dataset")]
    EmptyDataset,

    /// The embedding capability failed.
    #[error("embedder failure: {0}")]
    Embedder(#[from] EmbedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Returns `true` when the index simply has not been built yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when a persisted artifact is unreadable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Returns `true` when the index no longer matches the catalog.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns `true` when the embedding capability failed.
    pub fn is_embedder_failure(&self) -> bool {
        matches!(self, Self::Embedder(_))
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
