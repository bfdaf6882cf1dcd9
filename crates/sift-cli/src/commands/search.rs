use anyhow::{Context, Result};
use serde::Serialize;
use sift_core::schema::Database;
use sift_index::{IndexError, IndexStore, SearchContext, SearchHit};
use sift_pipeline::{embedder_from_config, Config};

/// A search hit joined with its catalog row.
#[derive(Debug, Serialize)]
pub struct ResolvedHit {
    pub rank: usize,
    pub score: f32,
    pub row_id: u64,
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
}

pub async fn run_search(query: &str, k: usize, json: bool, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let context = open_context(config, &db)?;

    let hits = context.search(query, k).await.map_err(explain)?;
    let resolved = resolve(&db, &hits)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        print_hits(query, &resolved);
    }

    Ok(())
}

/// Load the published index and the configured embedder.
///
/// Refuses an index built from a different catalog than `db` holds, since
/// its row ids would name the wrong rows.
pub fn open_context(config: &Config, db: &Database) -> Result<SearchContext> {
    let embedder = embedder_from_config(&config.embedder)?;
    let context =
        SearchContext::open(IndexStore::new(&config.index_dir), embedder).map_err(explain)?;
    check_catalog(&context, db)?;
    Ok(context)
}

/// Fail unless the serving index was built from the rows now in `db`.
pub fn check_catalog(context: &SearchContext, db: &Database) -> Result<()> {
    let catalog = db
        .catalog_fingerprint()
        .context("Failed to read the catalog")?;
    context.ensure_snapshot(catalog).map_err(explain)
}

/// Turn index errors into messages that say what to do next.
pub fn explain(err: IndexError) -> anyhow::Error {
    match &err {
        IndexError::NotFound { path } => anyhow::anyhow!(
            "No index found at {}.\n\nRun 'sift build <dataset>' first.",
            path.display()
        ),
        IndexError::Corrupt { path, reason } => anyhow::anyhow!(
            "The index at {} is corrupt ({reason}).\n\nRebuild it with 'sift build'.",
            path.display()
        ),
        IndexError::Embedder(e) => {
            anyhow::anyhow!("The embedding service failed: {e}\n\nCheck the [embedder] settings.")
        }
        IndexError::DimensionMismatch { expected, actual } => anyhow::anyhow!(
            "The index has {expected} dimensions but the embedder produced {actual}.\n\n\
             The embedder changed since the last build; run 'sift build' again."
        ),
        IndexError::Stale { .. } => anyhow::anyhow!(
            "The index was built from a different catalog than the one now imported.\n\n\
             Run 'sift build' to re-index the catalog."
        ),
        IndexError::Degenerate(_) => {
            anyhow::anyhow!("The query has no searchable content; try different words.")
        }
        _ => anyhow::Error::new(err),
    }
}

/// Look up the catalog row behind each hit.
pub fn resolve(db: &Database, hits: &[SearchHit]) -> Result<Vec<ResolvedHit>> {
    hits.iter()
        .map(|hit| {
            let row = db
                .get_row(hit.row_id)?
                .with_context(|| {
                    format!(
                        "Row {} is in the index but not in the catalog; run 'sift build' again",
                        hit.row_id
                    )
                })?;
            let payload = serde_json::from_str(&row.payload)
                .unwrap_or(serde_json::Value::String(row.payload));
            Ok(ResolvedHit {
                rank: hit.rank,
                score: hit.score,
                row_id: hit.row_id.get(),
                id: row.external_id,
                name: row.name,
                payload,
            })
        })
        .collect()
}

pub fn print_hits(query: &str, hits: &[ResolvedHit]) {
    if hits.is_empty() {
        println!("No results for {query:?}");
        return;
    }

    println!("\nResults for {query:?}:\n");
    for hit in hits {
        println!("  {:>3}. {:.4}  {}  ({})", hit.rank, hit.score, hit.name, hit.id);
    }
    println!();
}
