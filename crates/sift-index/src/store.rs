//! Persisted index artifacts.
//!
//! A store is a directory holding two files: `index.sift`, the searchable
//! index, and `embeddings.sift`, the raw normalized matrix kept for
//! inspection. Both are published atomically: bytes go to a temporary file
//! in the same directory, are synced, and the file is renamed into place.
//! Readers see either the previous artifact or the new one, never a partial
//! write.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{IndexError, IndexResult};
use crate::format;
use crate::index::{Index, Matrix};

/// File name of the searchable index within a store.
pub const INDEX_FILE: &str = "index.sift";

/// File name of the raw embedding matrix within a store.
pub const MATRIX_FILE: &str = "embeddings.sift";

/// A directory of persisted index artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    #[must_use]
    pub fn matrix_path(&self) -> PathBuf {
        self.root.join(MATRIX_FILE)
    }

    /// Whether an index has been published.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    /// Atomically publish `index`.
    pub fn save(&self, index: &Index) -> IndexResult<()> {
        let path = self.index_path();
        write_atomic(&path, &format::encode_index(index))?;
        log::info!(
            "Saved index of {} vectors ({} dimensions) to {}",
            index.len(),
            index.dimension(),
            path.display()
        );
        Ok(())
    }

    /// Load the published index.
    pub fn load(&self) -> IndexResult<Index> {
        let path = self.index_path();
        let bytes = read_artifact(&path)?;
        let index = format::decode_index(&bytes, &path)?;
        log::debug!(
            "Loaded index of {} vectors ({} dimensions) from {}",
            index.len(),
            index.dimension(),
            path.display()
        );
        Ok(index)
    }

    /// Atomically publish the raw embedding matrix.
    pub fn save_matrix(&self, matrix: &Matrix) -> IndexResult<()> {
        let path = self.matrix_path();
        write_atomic(&path, &format::encode_matrix(matrix))?;
        log::info!(
            "Saved {}x{} embedding matrix to {}",
            matrix.rows(),
            matrix.dimension(),
            path.display()
        );
        Ok(())
    }

    /// Load the raw embedding matrix.
    pub fn load_matrix(&self) -> IndexResult<Matrix> {
        let path = self.matrix_path();
        let bytes = read_artifact(&path)?;
        format::decode_matrix(&bytes, &path)
    }
}

fn read_artifact(path: &Path) -> IndexResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IndexError::NotFound {
            path: path.to_path_buf(),
        },
        _ => IndexError::Io(e),
    })
}

/// Write `bytes` to `path` via a synced temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> IndexResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use sift_core::RowId;
    use std::fs;
    use tempfile::TempDir;

    fn sample_index() -> Index {
        Index::from_entries(
            2,
            vec![
                (RowId::new(0), normalize(&[1.0, 0.0]).unwrap()),
                (RowId::new(1), normalize(&[0.0, 1.0]).unwrap()),
                (RowId::new(2), normalize(&[0.7, 0.7]).unwrap()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        let index = sample_index();

        store.save(&index).unwrap();

        assert!(store.exists());
        assert_eq!(store.load().unwrap(), index);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path().join("nested").join("store"));

        store.save(&sample_index()).unwrap();
        assert!(store.index_path().is_file());
    }

    #[test]
    fn test_save_replaces_previous_index() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());

        store.save(&sample_index()).unwrap();
        let smaller =
            Index::from_entries(2, vec![(RowId::new(0), normalize(&[1.0, 1.0]).unwrap())])
                .unwrap();
        store.save(&smaller).unwrap();

        assert_eq!(store.load().unwrap(), smaller);
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        store.save(&sample_index()).unwrap();
        store.save_matrix(&sample_index().to_matrix()).unwrap();

        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![MATRIX_FILE.to_string(), INDEX_FILE.to_string()]);
    }

    #[test]
    fn test_load_missing_index_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());

        assert!(!store.exists());
        let err = store.load().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        fs::write(store.index_path(), b"definitely not an index file").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_matrix_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        let matrix = sample_index().to_matrix();

        store.save_matrix(&matrix).unwrap();
        assert_eq!(store.load_matrix().unwrap(), matrix);
    }

    #[test]
    fn test_load_missing_matrix_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        assert!(store.load_matrix().unwrap_err().is_not_found());
    }
}
