use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{ImportRecord, Row, RowId, SnapshotHasher};

use super::migrations::MIGRATIONS;

/// A database connection holding the imported dataset catalog.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Row catalog
impl Database {
    /// Replace every row in the catalog with `rows` and record the import.
    ///
    /// Runs in a single transaction, so readers see either the old dataset
    /// or the new one.
    pub fn replace_rows(&mut self, rows: &[Row], source_path: &Path) -> Result<ImportRecord> {
        let record = ImportRecord::new(source_path.to_path_buf(), rows.len());

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM rows", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO rows (row_id, external_id, name, payload) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    i64::try_from(row.row_id.get()).unwrap_or(i64::MAX),
                    row.external_id,
                    row.name,
                    row.payload,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO imports (source_path, row_count, imported_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                record.source_path.to_string_lossy().as_ref(),
                i64::try_from(record.row_count).unwrap_or(i64::MAX),
                record.imported_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        log::debug!(
            "Replaced catalog with {} rows from {}",
            rows.len(),
            source_path.display()
        );
        Ok(record)
    }

    /// List all rows in row-id (dataset) order.
    pub fn list_rows(&self) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(
            "SELECT row_id, external_id, name, payload
             FROM rows
             ORDER BY row_id",
        )?;

        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Fetch a single row by id.
    pub fn get_row(&self, row_id: RowId) -> Result<Option<Row>> {
        let row = self
            .conn
            .query_row(
                "SELECT row_id, external_id, name, payload FROM rows WHERE row_id = ?1",
                [i64::try_from(row_id.get()).unwrap_or(i64::MAX)],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Snapshot fingerprint of the rows currently in the catalog.
    ///
    /// Equals [`snapshot_fingerprint`](crate::snapshot_fingerprint) of
    /// [`list_rows`](Self::list_rows), without loading payloads.
    pub fn catalog_fingerprint(&self) -> Result<u32> {
        let mut stmt = self
            .conn
            .prepare("SELECT row_id, name FROM rows ORDER BY row_id")?;
        let mut rows = stmt.query([])?;

        let mut hasher = SnapshotHasher::new();
        while let Some(row) = rows.next()? {
            let row_id: i64 = row.get(0)?;
            let row_id = u64::try_from(row_id)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, row_id))?;
            let name: String = row.get(1)?;
            hasher.update(RowId::new(row_id), &name);
        }
        Ok(hasher.finish())
    }

    /// Number of rows in the catalog.
    pub fn count_rows(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rows", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// The most recent import, if any.
    pub fn last_import(&self) -> Result<Option<ImportRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT source_path, row_count, imported_at
                 FROM imports
                 ORDER BY id DESC
                 LIMIT 1",
                [],
                |row| {
                    let source_path: String = row.get(0)?;
                    let row_count: i64 = row.get(1)?;
                    let imported_at: String = row.get(2)?;
                    let imported_at = chrono::DateTime::parse_from_rfc3339(&imported_at)
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                        })?;
                    Ok(ImportRecord {
                        source_path: PathBuf::from(source_path),
                        row_count: usize::try_from(row_count).unwrap_or(0),
                        imported_at: imported_at.into(),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Row> {
        let row_id: i64 = row.get(0)?;
        let row_id = u64::try_from(row_id)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, row_id))?;

        Ok(Row {
            row_id: RowId::new(row_id),
            external_id: row.get(1)?,
            name: row.get(2)?,
            payload: row.get(3)?,
        })
    }
}
