use anyhow::{Context, Result};
use std::path::PathBuf;
use sift_pipeline::{Config, ImportStage};

pub fn run_import(dataset: PathBuf, config: &Config) -> Result<()> {
    log::info!("Importing {}", dataset.display());

    let stage = ImportStage::new(dataset.clone(), config.database_path.clone(), config.columns());
    let record = stage
        .run()
        .with_context(|| format!("Failed to import {}", dataset.display()))?;

    println!("✓ Imported {} rows from {}", record.row_count, dataset.display());
    println!("\nRun 'sift build' to index them.");
    Ok(())
}
