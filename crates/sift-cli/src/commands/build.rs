use anyhow::{Context, Result};
use std::path::PathBuf;
use sift_index::IndexStore;
use sift_pipeline::{build_pipeline, embedder_from_config, BuildJob, Config};

pub async fn run_build(dataset: Option<PathBuf>, config: &Config) -> Result<()> {
    let job = BuildJob::new();
    match &dataset {
        Some(path) => log::info!("Starting {job} from {}", path.display()),
        None => log::info!("Starting {job}: re-indexing the catalog"),
    }
    let reimports = dataset.is_some();

    let embedder = embedder_from_config(&config.embedder)?;
    let workflow =
        build_pipeline(dataset, config, embedder).context("Failed to build pipeline")?;

    let parent = config
        .database_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
    let state_path = parent.join("pipeline.db");
    let mut state = treadle::SqliteStateStore::open(&state_path)
        .await
        .context("Failed to open pipeline state store")?;

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });
    // Drained after the run to decide success.
    let mut outcomes = workflow.subscribe();

    workflow
        .advance(&job, &mut state)
        .await
        .context("Pipeline execution failed")?;

    let mut failures = Vec::new();
    let mut import_failed = false;
    while let Ok(event) = outcomes.try_recv() {
        if let treadle::WorkflowEvent::StageFailed { stage, error, .. } = event {
            import_failed |= stage == "import";
            failures.push(format!("[{stage}] {error}"));
        }
    }
    if !failures.is_empty() {
        // A committed import with a failed index leaves the old index
        // describing rows that are no longer in the catalog.
        let note = if reimports && !import_failed {
            "\n\nThe dataset was imported, so the previous index no longer matches the \
             catalog and search will refuse it until 'sift build' succeeds."
        } else {
            ""
        };
        anyhow::bail!(
            "Build failed; the previous index (if any) is unchanged:\n  {}{note}",
            failures.join("\n  ")
        );
    }

    let store = IndexStore::new(&config.index_dir);
    let index = store.load().context("Failed to read the new index")?;
    println!(
        "\n✓ Index built: {} vectors, {} dimensions",
        index.len(),
        index.dimension()
    );
    println!("  in {}", store.root().display());
    println!("\nTry: sift search \"<what you are looking for>\"");

    Ok(())
}
