use anyhow::Result;
use sift_core::schema::Database;
use sift_index::IndexStore;
use sift_pipeline::Config;

/// How the published index relates to the catalog.
#[derive(Debug, PartialEq, Eq)]
enum IndexStatus {
    NotBuilt,
    Unreadable(String),
    /// Built from exactly the rows now in the catalog.
    Current { vectors: usize, dimension: usize },
    /// Built from some other catalog, even if the row counts agree.
    Stale { vectors: usize, dimension: usize },
}

fn index_status(store: &IndexStore, db: &Database) -> Result<IndexStatus> {
    if !store.exists() {
        return Ok(IndexStatus::NotBuilt);
    }

    let index = match store.load() {
        Ok(index) => index,
        Err(e) => return Ok(IndexStatus::Unreadable(e.to_string())),
    };

    let vectors = index.len();
    let dimension = index.dimension();
    if index.snapshot() == db.catalog_fingerprint()? {
        Ok(IndexStatus::Current { vectors, dimension })
    } else {
        Ok(IndexStatus::Stale { vectors, dimension })
    }
}

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let row_count = db.count_rows()?;

    println!("\n📊 Sift Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Catalog rows: {row_count}");
    match db.last_import()? {
        Some(import) => println!(
            "  Last import: {} ({} rows, {})",
            import.source_path.display(),
            import.row_count,
            import.imported_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("  Last import: never"),
    }

    let store = IndexStore::new(&config.index_dir);
    println!("\n  Index: {}", store.index_path().display());

    match index_status(&store, &db)? {
        IndexStatus::NotBuilt => {
            println!("  Index status: not built");
            println!("\n  Run `sift build <dataset>` to build it");
        }
        IndexStatus::Unreadable(reason) => {
            println!("  Index status: unreadable ({reason})");
            println!("\n  Run `sift build` to rebuild it");
        }
        IndexStatus::Current { vectors, dimension } => {
            println!("  Vectors: {vectors}");
            println!("  Dimensions: {dimension}");
            println!("  Index status: up to date with catalog");
        }
        IndexStatus::Stale { vectors, dimension } => {
            println!("  Vectors: {vectors}");
            println!("  Dimensions: {dimension}");
            println!("  Index status: stale (built from a different catalog import)");
            println!("\n  Run `sift build` to re-index the catalog");
        }
    }

    Ok(())
}
