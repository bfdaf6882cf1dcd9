use anyhow::Result;
use clap::Parser;
use sift_pipeline::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "sift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/sift/sift.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory holding the index (default: ~/.local/share/sift/index)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Import a dataset into the catalog
    ///
    /// Reads a CSV, JSON Lines (.jsonl/.ndjson), or JSON array file and
    /// replaces every row in the catalog with its rows. Each row needs an id,
    /// a name, and a payload column; the column names are configurable.
    ///
    /// Row ids are assigned by position in the file. The index is not
    /// touched; run 'sift build' afterwards.
    Import {
        /// Path to the dataset file
        dataset: PathBuf,
    },
    /// Build the search index
    ///
    /// Embeds the name of every catalog row, normalizes the vectors, and
    /// publishes the index and the embedding matrix. Given a dataset, imports
    /// it first. Without one, re-indexes the rows already in the catalog.
    ///
    /// The previous index stays in place until the new one is complete. A
    /// row whose name embeds to a zero vector aborts the build.
    Build {
        /// Optional dataset file to import before indexing
        dataset: Option<PathBuf>,
    },
    /// Search the index once
    Search {
        /// Free-text query
        query: String,

        /// Number of results (default: 5, or default_k from config)
        #[arg(short)]
        k: Option<usize>,

        /// Print results, with payloads, as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search interactively
    ///
    /// Reads one query per line. Type 'exit', 'quit', or 'q' to leave.
    Query {
        /// Number of results per query
        #[arg(short)]
        k: Option<usize>,
    },
    /// Show catalog and index status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one setting, or the whole config file
    Get {
        /// Setting name (e.g. index_dir, embedder.kind)
        key: Option<String>,
    },
    /// Change one setting in the config file
    Set {
        /// Setting name (e.g. index_dir, embedder.kind)
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import { dataset } => {
            let config = load_config(cli.db, cli.index_dir)?;
            commands::run_import(dataset, &config)?;
        }
        Commands::Build { dataset } => {
            let config = load_config(cli.db, cli.index_dir)?;
            commands::run_build(dataset, &config).await?;
        }
        Commands::Search { query, k, json } => {
            let config = load_config(cli.db, cli.index_dir)?;
            let k = k.unwrap_or(config.default_k);
            commands::run_search(&query, k, json, &config).await?;
        }
        Commands::Query { k } => {
            let config = load_config(cli.db, cli.index_dir)?;
            let k = k.unwrap_or(config.default_k);
            commands::run_query(k, &config).await?;
        }
        Commands::Status => {
            let config = load_config(cli.db, cli.index_dir)?;
            commands::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config()?,
            ConfigAction::Get { key } => commands::config::get_config(key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

/// Load configuration with CLI overrides and make sure the catalog's
/// directory exists.
fn load_config(db: Option<PathBuf>, index_dir: Option<PathBuf>) -> Result<Config> {
    let config = Config::load_with_overrides(db, index_dir)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(config)
}
