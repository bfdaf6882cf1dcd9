pub mod ids;
pub mod import;
pub mod row;
pub mod snapshot;

pub use ids::RowId;
pub use import::ImportRecord;
pub use row::Row;
pub use snapshot::{snapshot_fingerprint, SnapshotHasher};
