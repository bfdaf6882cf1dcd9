//! Error types for the build workflow.

use sift_index::IndexError;
use thiserror::Error;

/// Errors that can occur while importing a dataset or building its index.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An error propagated from the catalog or dataset readers.
    #[error("catalog error: {0}")]
    Core(#[from] sift_core::Error),

    /// An error propagated from building or persisting the index.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The configured embedder cannot be constructed.
    #[error("invalid embedder configuration: {0}")]
    EmbedderConfig(String),

    /// An HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl PipelineError {
    /// Returns `true` when the failure came from the embedding capability.
    pub fn is_embedder_failure(&self) -> bool {
        matches!(self, Self::Index(e) if e.is_embedder_failure())
    }
}

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
