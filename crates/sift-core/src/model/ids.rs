use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a record in the dataset it was imported from.
///
/// Row ids are zero-based and dense: the n-th record of a dataset always
/// gets `RowId(n)`. They are the join key between the catalog and every
/// vector index built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Row id for the record at `position` in dataset order.
    #[must_use]
    pub const fn from_position(position: usize) -> Self {
        Self(position as u64)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
