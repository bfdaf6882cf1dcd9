use serde::Serialize;
use sift_core::RowId;

use crate::backend::{FlatBackend, SimilarityBackend};
use crate::error::{IndexError, IndexResult};
use crate::index::Index;
use crate::normalize::UnitVector;

/// One ranked search result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based position in the result list.
    pub rank: usize,
    pub row_id: RowId,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Read-only top-k search over one similarity backend.
///
/// Holds no mutable state, so a shared engine can serve any number of
/// concurrent queries.
#[derive(Debug)]
pub struct QueryEngine {
    backend: Box<dyn SimilarityBackend>,
    snapshot: u32,
}

impl QueryEngine {
    /// An engine over `backend`, whose row ids belong to the catalog with
    /// fingerprint `snapshot`.
    #[must_use]
    pub fn new(backend: Box<dyn SimilarityBackend>, snapshot: u32) -> Self {
        Self { backend, snapshot }
    }

    /// An engine doing exact brute-force search over `index`.
    #[must_use]
    pub fn flat(index: Index) -> Self {
        let snapshot = index.snapshot();
        Self::new(Box::new(FlatBackend::new(index)), snapshot)
    }

    /// Fingerprint of the catalog the searched index was built from.
    #[must_use]
    pub const fn snapshot(&self) -> u32 {
        self.snapshot
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Number of searchable vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// The `k` stored vectors most similar to `query`.
    ///
    /// Results are sorted by descending score, ties by ascending row id.
    /// `k == 0` yields no results; `k` larger than the index yields all of
    /// it. A query of the wrong dimension is an error, never padded or
    /// truncated.
    pub fn search(&self, query: &UnitVector, k: usize) -> IndexResult<Vec<SearchHit>> {
        let expected = self.backend.dimension();
        if query.dimension() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: query.dimension(),
            });
        }

        let k = k.min(self.backend.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .backend
            .rank(query.as_slice(), k)
            .into_iter()
            .enumerate()
            .map(|(i, scored)| SearchHit {
                rank: i + 1,
                row_id: scored.row_id,
                score: scored.score.clamp(-1.0, 1.0),
            })
            .collect();

        Ok(hits)
    }
}
