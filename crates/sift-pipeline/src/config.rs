use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use sift_core::Columns;
use std::path::PathBuf;

/// Configuration for sift.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SIFT_* prefix)
/// 3. Config file (~/.config/sift/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: SIFT_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/sift/sift.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Directory holding the persisted index artifacts.
    ///
    /// Can be set via:
    /// - CLI: --index-dir /path/to/dir
    /// - ENV: SIFT_INDEX_DIR
    /// - Config: index_dir = "/path/to/dir"
    /// - Default: ~/.local/share/sift/index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Dataset column holding the external id.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Dataset column holding the embedded name.
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Dataset column holding the opaque payload.
    #[serde(default = "default_payload_column")]
    pub payload_column: String,

    /// Rows per embedder call during a build.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Results returned when `-k` is not given.
    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default)]
    pub embedder: EmbedderConfig,
}

/// Which embedder to use and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,

    /// Output dimension of the hashing embedder.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Endpoint of an OpenAI-compatible embeddings API.
    #[serde(default)]
    pub url: Option<String>,

    /// Model name sent with each embeddings request.
    #[serde(default)]
    pub model: Option<String>,

    /// Bearer token for the embeddings API.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Offline feature-hashing embedder.
    #[default]
    Hashing,
    /// Remote embeddings API.
    Http,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            index_dir: default_index_dir(),
            id_column: default_id_column(),
            name_column: default_name_column(),
            payload_column: default_payload_column(),
            batch_size: default_batch_size(),
            default_k: default_k(),
            embedder: EmbedderConfig::default(),
        }
    }
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            dimension: default_dimension(),
            url: None,
            model: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/sift/config.toml
    /// Reads environment variables with SIFT_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("sift");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, then apply CLI path overrides.
    ///
    /// This is used when the --db or --index-dir flags are provided.
    pub fn load_with_overrides(
        db_path: Option<PathBuf>,
        index_dir: Option<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::load()?.with_overrides(db_path, index_dir))
    }

    #[must_use]
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, index_dir: Option<PathBuf>) -> Self {
        if let Some(db_path) = db_path {
            self.database_path = db_path;
        }
        if let Some(index_dir) = index_dir {
            self.index_dir = index_dir;
        }
        self
    }

    /// Dataset column mapping.
    #[must_use]
    pub fn columns(&self) -> Columns {
        Columns {
            id: self.id_column.clone(),
            name: self.name_column.clone(),
            payload: self.payload_column.clone(),
        }
    }
}

fn default_db_path() -> PathBuf {
    data_dir().join("sift.db")
}

fn default_index_dir() -> PathBuf {
    data_dir().join("index")
}

/// Returns: ~/.local/share/sift (or platform equivalent)
fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sift")
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_name_column() -> String {
    "name".to_string()
}

fn default_payload_column() -> String {
    "payload".to_string()
}

const fn default_batch_size() -> usize {
    sift_index::IndexBuilder::DEFAULT_BATCH_SIZE
}

const fn default_k() -> usize {
    5
}

const fn default_dimension() -> usize {
    sift_index::HashingEmbedder::DEFAULT_DIMENSION
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/sift/config.toml
/// - macOS: ~/Library/Application Support/sift/config.toml
/// - Windows: %APPDATA%\sift\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sift")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Sift Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SIFT_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite catalog holding imported rows
#
# Can also be set via:
# - CLI: sift --db /custom/path.db build
# - Environment: SIFT_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/sift.db"

# Directory for the index (index.sift) and embedding matrix (embeddings.sift)
#
# Can also be set via:
# - CLI: sift --index-dir /custom/index search "send emails"
# - Environment: SIFT_INDEX_DIR=/custom/index
#index_dir = "/path/to/custom/index"

# Dataset columns (CSV headers or JSON keys)
id_column = "id"
name_column = "name"
payload_column = "payload"

# Rows sent to the embedder per request while building
batch_size = 64

# Results returned by search and query when -k is not given
default_k = 5

[embedder]
# "hashing" needs no model or network. "http" calls an OpenAI-compatible
# embeddings endpoint.
kind = "hashing"

# Output dimension of the hashing embedder
dimension = 384

# Settings for kind = "http"
#url = "http://localhost:11434/v1/embeddings"
#model = "all-minilm"
#api_key = "your-api-key-here"
timeout_secs = 30
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
