use std::path::PathBuf;
use std::sync::Arc;

use sift_index::{Embedder, IndexBuilder, IndexStore};
use treadle::Workflow;

use crate::{Config, ImportStage, IndexStage};

/// Build the import + index pipeline.
///
/// With a dataset the workflow imports it first and indexes the result;
/// without one it only re-indexes the rows already in the catalog.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(
    dataset: Option<PathBuf>,
    config: &Config,
    embedder: Arc<dyn Embedder>,
) -> treadle::Result<Workflow> {
    let index_stage = IndexStage::new(
        config.database_path.clone(),
        IndexStore::new(config.index_dir.clone()),
        embedder,
        IndexBuilder::new().with_batch_size(config.batch_size),
    );

    match dataset {
        Some(dataset) => {
            let import_stage =
                ImportStage::new(dataset, config.database_path.clone(), config.columns());
            Workflow::builder()
                .stage("import", import_stage)
                .stage("index", index_stage)
                .dependency("index", "import")
                .build()
        }
        None => Workflow::builder().stage("index", index_stage).build(),
    }
}
