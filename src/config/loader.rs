//! Configuration loading from file system
//!
//! Handles loading and parsing the JSON config file.

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::defaults::APP_DIR_NAME;
use super::types::IndexerConfig;

/// Default config location: $XDG_CONFIG_HOME/clipindex/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config").as_ref()))
        .join(APP_DIR_NAME)
        .join("config.json")
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// Returns IndexerConfig::default() if the file is missing or cannot be parsed.
/// A `~` prefix in `cacheRoot` is expanded.
#[instrument(name = "load_config")]
pub fn load_config(path: Option<&Path>) -> IndexerConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return IndexerConfig::default();
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Failed to read config, using defaults");
            return IndexerConfig::default();
        }
    };

    parse_config(&content).unwrap_or_else(|e| {
        warn!(
            path = %config_path.display(),
            error = %e,
            "Failed to parse config JSON, using defaults"
        );
        IndexerConfig::default()
    })
}

/// Parse config JSON and normalize paths
pub(crate) fn parse_config(json: &str) -> Result<IndexerConfig, serde_json::Error> {
    let mut config: IndexerConfig = serde_json::from_str(json)?;
    let raw = config.cache_root.to_string_lossy().into_owned();
    config.cache_root = PathBuf::from(shellexpand::tilde(&raw).as_ref());
    Ok(config)
}
