//! Configuration module - indexer settings
//!
//! This module provides functionality for:
//! - Loading configuration from $XDG_CONFIG_HOME/clipindex/config.json
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (IndexerConfig, TimeoutConfig, etc.)
//! - `loader` - File system loading and parsing

mod defaults;
mod loader;
mod types;

pub use defaults::DEFAULT_OCR_LANGUAGE;

pub use types::{CommandConfig, IndexerConfig, NotifyConfig, SearchConfig, TimeoutConfig};

pub use loader::{default_config_path, load_config};

#[cfg(test)]
pub use defaults::*;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
