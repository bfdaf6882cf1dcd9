use std::path::PathBuf;

use sift_core::model::ImportRecord;
use sift_core::schema::Database;
use sift_core::{read_dataset, Columns};
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::PipelineResult;

/// The Import stage: read a dataset file and replace the catalog rows.
///
/// Row ids are assigned by position in the file, so the catalog always
/// mirrors exactly one dataset snapshot.
#[derive(Debug)]
pub struct ImportStage {
    dataset: PathBuf,
    db_path: PathBuf,
    columns: Columns,
}

impl ImportStage {
    #[must_use]
    pub fn new(dataset: PathBuf, db_path: PathBuf, columns: Columns) -> Self {
        Self {
            dataset,
            db_path,
            columns,
        }
    }

    /// Import the dataset and return the recorded import.
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be read or the catalog cannot
    /// be written. A failed import leaves the previous rows in place.
    pub fn run(&self) -> PipelineResult<ImportRecord> {
        let rows = read_dataset(&self.dataset, &self.columns)?;
        log::debug!("Read {} rows from {}", rows.len(), self.dataset.display());

        let mut db = Database::open(&self.db_path)?;
        let record = db.replace_rows(&rows, &self.dataset)?;
        Ok(record)
    }
}

#[async_trait::async_trait]
impl Stage for ImportStage {
    fn name(&self) -> &str {
        "import"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Importing {}", self.dataset.display());

        match self.run() {
            Ok(record) => {
                log::info!("Import complete: {} rows", record.row_count);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Import failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::RowId;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_import_csv_replaces_rows() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let first = temp_dir.path().join("first.csv");
        let second = temp_dir.path().join("second.csv");
        fs::write(&first, "id,name,payload\na,email automation,{}\nb,file backup,{}\n").unwrap();
        fs::write(&second, "id,name,payload\nc,payment processing,{}\n").unwrap();

        let record = ImportStage::new(first, db_path.clone(), Columns::default())
            .run()
            .unwrap();
        assert_eq!(record.row_count, 2);

        let record = ImportStage::new(second.clone(), db_path.clone(), Columns::default())
            .run()
            .unwrap();
        assert_eq!(record.row_count, 1);
        assert_eq!(record.source_path, second);

        let db = Database::open(&db_path).unwrap();
        let rows = db.list_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, RowId::new(0));
        assert_eq!(rows[0].name, "payment processing");
    }

    #[test]
    fn test_import_missing_dataset_fails() {
        let temp_dir = TempDir::new().unwrap();
        let stage = ImportStage::new(
            temp_dir.path().join("missing.csv"),
            temp_dir.path().join("test.db"),
            Columns::default(),
        );
        assert!(stage.run().is_err());
    }

    #[tokio::test]
    async fn test_import_stage_name() {
        let stage = ImportStage::new(
            PathBuf::from("data.csv"),
            PathBuf::from("test.db"),
            Columns::default(),
        );
        assert_eq!(stage.name(), "import");
    }
}
