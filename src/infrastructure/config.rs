//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Quote Deck Configuration
# Auto-generated - edit as needed

[sync]
# Interval between syncs in seconds (default: 120 = 2 minutes)
interval_secs = 120

# Whether periodic sync runs inside `shell`
enabled = true

# Remote collection (any endpoint returning a JSON array of objects with `title`)
endpoint = "https://jsonplaceholder.typicode.com/posts"

# Records requested per sync
page_size = 5

# Reconciliation policy: "append-novel" or "replace-server"
policy = "append-novel"

# POST locally added quotes to the endpoint (response is only logged)
post_on_add = false

# HTTP timeout in seconds
timeout_secs = 10

[display]
# How long sync status lines stay visible in the shell, in milliseconds
status_ttl_ms = 2500

[paths]
# Custom data directory (optional, defaults to ~/.quote-deck)
# data_dir = "/custom/path"
"#;

/// Load configuration from `data_dir/config.toml`, or the default location.
///
/// A missing file yields the defaults. An explicit `data_dir` always wins
/// over the one written inside the file.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = config_file_path(data_dir);

    let mut config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = data_dir {
        config.paths.data_dir = Some(dir.to_path_buf());
    }

    Ok(config)
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = config.config_file_path();

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(&config_path, content).map_err(|e| {
        AppError::io(
            format!("Failed to write config file: {}", config_path.display()),
            e,
        )
    })?;

    tracing::info!(path = %config_path.display(), "Configuration saved");

    Ok(())
}

/// Create the commented default configuration file if it doesn't exist.
///
/// Returns the path of the file.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(data_dir: Option<&Path>) -> Result<PathBuf> {
    let config_path = config_file_path(data_dir);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(config_path)
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map_or_else(AppConfig::default_data_dir, Path::to_path_buf)
        .join("config.toml")
}
