use std::path::PathBuf;
use std::sync::Arc;

use sift_core::schema::Database;
use sift_index::{Embedder, IndexBuilder, IndexStore};
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::PipelineResult;

/// Summary of a completed index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub vectors: usize,
    pub dimension: usize,
}

/// The Index stage: embed every catalog row and publish the index.
///
/// The embedding matrix is written first and the index last, so a reader
/// never sees a new index without its matrix. On any failure the previously
/// published index is left untouched.
#[derive(Debug)]
pub struct IndexStage {
    db_path: PathBuf,
    store: IndexStore,
    embedder: Arc<dyn Embedder>,
    builder: IndexBuilder,
}

impl IndexStage {
    #[must_use]
    pub fn new(
        db_path: PathBuf,
        store: IndexStore,
        embedder: Arc<dyn Embedder>,
        builder: IndexBuilder,
    ) -> Self {
        Self {
            db_path,
            store,
            embedder,
            builder,
        }
    }

    /// Build and publish the index for the rows currently in the catalog.
    ///
    /// # Errors
    /// Returns an error if the catalog cannot be read, the catalog is empty,
    /// any row embeds to a degenerate vector, the embedder fails, or the
    /// artifacts cannot be written.
    pub async fn run(&self) -> PipelineResult<IndexReport> {
        // The connection is not Send; drop it before awaiting the embedder.
        let rows = {
            let db = Database::open(&self.db_path)?;
            db.list_rows()?
        };
        log::debug!("Loaded {} rows from catalog", rows.len());

        let output = self.builder.build(&rows, self.embedder.as_ref()).await?;

        self.store.save_matrix(&output.matrix)?;
        self.store.save(&output.index)?;

        Ok(IndexReport {
            vectors: output.index.len(),
            dimension: output.index.dimension(),
        })
    }
}

#[async_trait::async_trait]
impl Stage for IndexStage {
    fn name(&self) -> &str {
        "index"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Building index in {}", self.store.root().display());

        match self.run().await {
            Ok(report) => {
                log::info!(
                    "Index complete: {} vectors, {} dimensions",
                    report.vectors,
                    report.dimension
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Index build failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use sift_core::{Row, RowId};
    use sift_index::{HashingEmbedder, IndexError};
    use tempfile::TempDir;

    fn seed(db_path: &std::path::Path, names: &[&str]) {
        let rows: Vec<Row> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Row::new(RowId::from_position(i), format!("wf-{i}"), *name, "{}"))
            .collect();
        let mut db = Database::open(db_path).unwrap();
        db.replace_rows(&rows, std::path::Path::new("seed.csv")).unwrap();
    }

    fn stage(temp_dir: &TempDir) -> IndexStage {
        IndexStage::new(
            temp_dir.path().join("test.db"),
            IndexStore::new(temp_dir.path().join("index")),
            Arc::new(HashingEmbedder::new(32)),
            IndexBuilder::new(),
        )
    }

    #[tokio::test]
    async fn test_index_stage_publishes_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        seed(
            &temp_dir.path().join("test.db"),
            &["email automation", "file backup", "payment processing"],
        );
        let stage = stage(&temp_dir);

        let report = stage.run().await.unwrap();

        assert_eq!(
            report,
            IndexReport {
                vectors: 3,
                dimension: 32
            }
        );
        let store = IndexStore::new(temp_dir.path().join("index"));
        assert_eq!(store.load().unwrap().len(), 3);
        assert_eq!(store.load_matrix().unwrap().rows(), 3);
    }

    #[tokio::test]
    async fn test_index_stage_empty_catalog_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = stage(&temp_dir).run().await;
        assert!(matches!(
            result,
            Err(PipelineError::Index(IndexError::EmptyDataset))
        ));
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_index() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        seed(&db_path, &["email automation", "file backup"]);
        let stage = stage(&temp_dir);
        stage.run().await.unwrap();

        // A name with no alphanumeric characters embeds to the zero vector.
        seed(&db_path, &["email automation", "!!!", "file backup"]);
        let result = stage.run().await;
        assert!(matches!(
            result,
            Err(PipelineError::Index(IndexError::DegenerateRow { .. }))
        ));

        let store = IndexStore::new(temp_dir.path().join("index"));
        assert_eq!(store.load().unwrap().len(), 2);
    }
}
