use crate::model::{Row, RowId};

/// CRC-32 over the ordered `(row_id, name)` pairs of a catalog.
///
/// An index records the fingerprint of the rows it was built from. Any
/// re-import that changes a name, the order, or the row count changes the
/// fingerprint, so an index that no longer matches the catalog is detected
/// before its row ids are joined back to rows.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHasher {
    hasher: crc32fast::Hasher,
    rows: u64,
}

impl SnapshotHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, row_id: RowId, name: &str) {
        self.hasher.update(&row_id.get().to_le_bytes());
        self.hasher.update(&(name.len() as u64).to_le_bytes());
        self.hasher.update(name.as_bytes());
        self.rows += 1;
    }

    #[must_use]
    pub fn finish(self) -> u32 {
        let mut hasher = self.hasher;
        hasher.update(&self.rows.to_le_bytes());
        hasher.finalize()
    }
}

/// Fingerprint of `rows` in the order given.
#[must_use]
pub fn snapshot_fingerprint(rows: &[Row]) -> u32 {
    let mut hasher = SnapshotHasher::new();
    for row in rows {
        hasher.update(row.row_id, &row.name);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(names: &[&str]) -> Vec<Row> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Row::new(RowId::from_position(i), format!("wf-{i}"), *name, "{}"))
            .collect()
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = rows(&["email automation", "file backup"]);
        assert_eq!(snapshot_fingerprint(&a), snapshot_fingerprint(&a.clone()));
    }

    #[test]
    fn test_fingerprint_ignores_ids_and_payloads() {
        let a = rows(&["email automation", "file backup"]);
        let mut b = a.clone();
        b[0].external_id = "other".to_string();
        b[1].payload = r#"{"nodes": 9}"#.to_string();
        assert_eq!(snapshot_fingerprint(&a), snapshot_fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_changes_with_names_and_order() {
        let a = snapshot_fingerprint(&rows(&["email automation", "file backup", "payment processing"]));
        let renamed = snapshot_fingerprint(&rows(&["stock trading bot", "weather alerts", "email automation"]));
        let reordered = snapshot_fingerprint(&rows(&["file backup", "email automation", "payment processing"]));
        assert_ne!(a, renamed);
        assert_ne!(a, reordered);
    }

    #[test]
    fn test_fingerprint_separates_name_boundaries() {
        let a = snapshot_fingerprint(&rows(&["ab", "c"]));
        let b = snapshot_fingerprint(&rows(&["a", "bc"]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_catalog_has_stable_fingerprint() {
        assert_eq!(snapshot_fingerprint(&[]), SnapshotHasher::new().finish());
    }
}
