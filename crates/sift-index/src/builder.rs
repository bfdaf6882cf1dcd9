use sift_core::{snapshot_fingerprint, Row, RowId};

use crate::embed::Embedder;
use crate::error::{EmbedError, IndexError, IndexResult};
use crate::index::{Index, Matrix};
use crate::normalize::{normalize, UnitVector};

/// Everything a build produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    /// The searchable index.
    pub index: Index,
    /// The normalized embeddings as a bare `[n, dim]` matrix, in dataset
    /// order. Kept for inspection only.
    pub matrix: Matrix,
}

/// Embeds and normalizes a full dataset snapshot into an [`Index`].
///
/// Rows are embedded by name, in dataset order, `batch_size` at a time. The
/// first row that embeds to a degenerate vector aborts the build; no partial
/// index is ever returned. The same rows and embedder always produce the
/// same index, bit for bit.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    batch_size: usize,
}

impl IndexBuilder {
    /// Default number of rows per embedder call.
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn build<E>(&self, rows: &[Row], embedder: &E) -> IndexResult<BuildOutput>
    where
        E: Embedder + ?Sized,
    {
        if rows.is_empty() {
            return Err(IndexError::EmptyDataset);
        }

        log::info!(
            "Embedding {} rows in batches of {}",
            rows.len(),
            self.batch_size
        );

        let mut dimension = None;
        let mut entries: Vec<(RowId, UnitVector)> = Vec::with_capacity(rows.len());

        for (batch_no, batch) in rows.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|row| row.name.as_str()).collect();
            let vectors = embedder.encode_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexError::Embedder(EmbedError::Malformed(format!(
                    "expected {} vectors for batch {}, got {}",
                    batch.len(),
                    batch_no,
                    vectors.len()
                ))));
            }

            for (row, raw) in batch.iter().zip(vectors) {
                let unit = normalize(&raw).map_err(|_| IndexError::DegenerateRow {
                    row_id: row.row_id,
                    name: row.name.clone(),
                })?;

                let expected = *dimension.get_or_insert(unit.dimension());
                if unit.dimension() != expected {
                    return Err(IndexError::InconsistentDimension {
                        row_id: row.row_id,
                        expected,
                        actual: unit.dimension(),
                    });
                }
                entries.push((row.row_id, unit));
            }

            log::debug!("Embedded {}/{} rows", entries.len(), rows.len());
        }

        // Non-empty dataset with no degenerate rows always sets the dimension.
        let dimension = dimension.unwrap_or_default();
        let index =
            Index::from_entries(dimension, entries)?.with_snapshot(snapshot_fingerprint(rows));
        let matrix = index.to_matrix();

        log::info!(
            "Built index of {} vectors ({} dimensions)",
            index.len(),
            index.dimension()
        );
        Ok(BuildOutput { index, matrix })
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}
