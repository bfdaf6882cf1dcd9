use std::collections::HashSet;

use sift_core::RowId;

use crate::error::{IndexError, IndexResult};
use crate::normalize::UnitVector;

/// An immutable, ordered set of unit vectors keyed by row id.
///
/// Vectors are stored row-major in one contiguous buffer. Every vector has
/// the same dimension and row ids are unique.
///
/// `snapshot` is the catalog fingerprint (see
/// [`sift_core::snapshot_fingerprint`]) of the rows the index was built from.
/// Row ids are only meaningful against a catalog with the same fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    dimension: usize,
    snapshot: u32,
    row_ids: Vec<RowId>,
    data: Vec<f32>,
}

impl Index {
    /// Assemble an index from normalized vectors, preserving order.
    ///
    /// An index with no entries has the given `dimension`.
    pub fn from_entries(
        dimension: usize,
        entries: impl IntoIterator<Item = (RowId, UnitVector)>,
    ) -> IndexResult<Self> {
        let mut row_ids = Vec::new();
        let mut data = Vec::new();
        let mut seen = HashSet::new();

        for (row_id, vector) in entries {
            if vector.dimension() != dimension {
                return Err(IndexError::InconsistentDimension {
                    row_id,
                    expected: dimension,
                    actual: vector.dimension(),
                });
            }
            if !seen.insert(row_id) {
                return Err(IndexError::DuplicateRowId(row_id));
            }
            row_ids.push(row_id);
            data.extend_from_slice(vector.as_slice());
        }

        Ok(Self {
            dimension,
            snapshot: 0,
            row_ids,
            data,
        })
    }

    /// Assemble an index from already validated parts.
    pub(crate) fn from_raw_parts(
        dimension: usize,
        snapshot: u32,
        row_ids: Vec<RowId>,
        data: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(row_ids.len() * dimension, data.len());
        Self {
            dimension,
            snapshot,
            row_ids,
            data,
        }
    }

    /// Tag the index with the fingerprint of the catalog it was built from.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: u32) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Fingerprint of the catalog this index was built from.
    #[must_use]
    pub const fn snapshot(&self) -> u32 {
        self.snapshot
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    #[must_use]
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    /// The vector at `position`, if any.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// `(row_id, vector)` pairs in index order.
    pub fn entries(&self) -> impl Iterator<Item = (RowId, &[f32])> + '_ {
        // chunks_exact panics on a zero chunk size.
        let chunk = self.dimension.max(1);
        self.row_ids
            .iter()
            .copied()
            .zip(self.data.chunks_exact(chunk))
    }

    /// The row-major vector buffer.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Copy the vectors out as a bare `[n, dim]` matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix {
        Matrix {
            rows: self.len(),
            dimension: self.dimension,
            data: self.data.clone(),
        }
    }
}

/// A dense `[rows, dimension]` matrix of `f32`, row-major.
///
/// Written next to the index as a debugging artifact; never queried.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    dimension: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub(crate) fn from_raw_parts(rows: usize, dimension: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(rows * dimension, data.len());
        Self {
            rows,
            dimension,
            data,
        }
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row `i` of the matrix, if any.
    #[must_use]
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}
