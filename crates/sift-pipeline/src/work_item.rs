use serde::{Deserialize, Serialize};
use std::fmt;
use treadle::WorkItem;

/// One run of the build workflow.
///
/// This is the treadle `WorkItem` that flows through the import → index
/// stages. What a run imports is fixed when the workflow is built; the job
/// only identifies the run. Each job gets a fresh id, so the state store
/// never considers a new build already done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    id: String,
}

impl BuildJob {
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for BuildJob {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkItem for BuildJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for BuildJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build {}", self.id)
    }
}
