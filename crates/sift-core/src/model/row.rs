use serde::{Deserialize, Serialize};

use crate::model::ids::RowId;

/// One dataset record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Position of the record in the source dataset.
    pub row_id: RowId,

    /// The dataset's own identifier for the record (opaque).
    pub external_id: String,

    /// Short name or title. This is the text that gets embedded.
    pub name: String,

    /// Opaque content associated with the record, e.g. a JSON document.
    pub payload: String,
}

impl Row {
    #[must_use]
    pub fn new(
        row_id: RowId,
        external_id: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            row_id,
            external_id: external_id.into(),
            name: name.into(),
            payload: payload.into(),
        }
    }
}
