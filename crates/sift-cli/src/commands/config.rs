use anyhow::{Context, Result};
use sift_pipeline::{config, Config, EmbedderKind};
use toml_edit::DocumentMut;

/// Keys accepted by `config get` and `config set`.
const KEYS: &[&str] = &[
    "database_path",
    "index_dir",
    "id_column",
    "name_column",
    "payload_column",
    "batch_size",
    "default_k",
    "embedder.kind",
    "embedder.dimension",
    "embedder.url",
    "embedder.model",
    "embedder.api_key",
    "embedder.timeout_secs",
];

/// Keys whose values are written as TOML integers.
const INTEGER_KEYS: &[&str] = &[
    "batch_size",
    "default_k",
    "embedder.dimension",
    "embedder.timeout_secs",
];

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    for key in KEYS {
        println!("  {key}: {}", display_value(&config, key));
    }

    println!("\nPriority: CLI args > ENV vars (SIFT_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;
        if !KEYS.contains(&key.as_str()) {
            anyhow::bail!("Unknown config key: {key}\n\nValid keys: {}", KEYS.join(", "));
        }
        println!("{}", display_value(&config, &key));
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'sift config init' to create it.");
        }
    }

    Ok(())
}

/// Set a config value.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();

    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = set_value(&contents, key, value)?;

    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {key} = {value}");
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure sift.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

fn display_value(config: &Config, key: &str) -> String {
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "<not set>".to_string());
    match key {
        "database_path" => config.database_path.display().to_string(),
        "index_dir" => config.index_dir.display().to_string(),
        "id_column" => config.id_column.clone(),
        "name_column" => config.name_column.clone(),
        "payload_column" => config.payload_column.clone(),
        "batch_size" => config.batch_size.to_string(),
        "default_k" => config.default_k.to_string(),
        "embedder.kind" => match config.embedder.kind {
            EmbedderKind::Hashing => "hashing".to_string(),
            EmbedderKind::Http => "http".to_string(),
        },
        "embedder.dimension" => config.embedder.dimension.to_string(),
        "embedder.url" => optional(&config.embedder.url),
        "embedder.model" => optional(&config.embedder.model),
        "embedder.api_key" => match config.embedder.api_key {
            Some(_) => "<set>".to_string(),
            None => "<not set>".to_string(),
        },
        "embedder.timeout_secs" => config.embedder.timeout_secs.to_string(),
        _ => String::new(),
    }
}

/// Return `contents` with `key` set to `value`, preserving comments and
/// layout.
fn set_value(contents: &str, key: &str, value: &str) -> Result<String> {
    if !KEYS.contains(&key) {
        anyhow::bail!("Unknown config key: {key}\n\nValid keys: {}", KEYS.join(", "));
    }

    let item = if INTEGER_KEYS.contains(&key) {
        let n: i64 = value
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .with_context(|| format!("{key} must be a positive integer, got {value:?}"))?;
        toml_edit::value(n)
    } else {
        if key == "embedder.kind" && !matches!(value, "hashing" | "http") {
            anyhow::bail!("embedder.kind must be \"hashing\" or \"http\", got {value:?}");
        }
        toml_edit::value(value)
    };

    let mut doc: DocumentMut = contents.parse().context("Failed to parse config file")?;
    match key.split_once('.') {
        Some((table, field)) => doc[table][field] = item,
        None => doc[key] = item,
    }

    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_top_level_value() {
        let updated = set_value("# comment\ndefault_k = 5\n", "default_k", "10").unwrap();
        assert!(updated.contains("# comment"));
        assert!(updated.contains("default_k = 10"));
    }

    #[test]
    fn test_set_creates_embedder_table() {
        let updated = set_value("", "embedder.kind", "http").unwrap();
        let config: Config = toml::from_str(&updated).unwrap();
        assert_eq!(config.embedder.kind, EmbedderKind::Http);
    }

    #[test]
    fn test_set_example_config_roundtrips() {
        let updated = set_value(config::example_config(), "embedder.dimension", "64").unwrap();
        let config: Config = toml::from_str(&updated).unwrap();
        assert_eq!(config.embedder.dimension, 64);
        assert_eq!(config.default_k, 5);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        assert!(set_value("", "no_such_key", "1").is_err());
        assert!(set_value("", "default_k", "-3").is_err());
        assert!(set_value("", "batch_size", "many").is_err());
        assert!(set_value("", "embedder.kind", "magic").is_err());
    }

    #[test]
    fn test_display_hides_api_key() {
        let mut config = Config::default();
        config.embedder.api_key = Some("secret".to_string());
        assert_eq!(display_value(&config, "embedder.api_key"), "<set>");
        assert_eq!(display_value(&config, "default_k"), "5");
    }
}
