use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A completed dataset import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Dataset file the rows came from.
    pub source_path: PathBuf,

    /// Number of rows written to the catalog.
    pub row_count: usize,

    pub imported_at: DateTime<Utc>,
}

impl ImportRecord {
    #[must_use]
    pub fn new(source_path: PathBuf, row_count: usize) -> Self {
        Self {
            source_path,
            row_count,
            imported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_record_new() {
        let before = Utc::now();
        let record = ImportRecord::new(PathBuf::from("/data/workflows.csv"), 12);
        assert_eq!(record.row_count, 12);
        assert!(record.imported_at >= before);
    }
}
