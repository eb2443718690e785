//! Ingest configuration.
//!
//! Loaded from `config.toml` in the working directory (or `--config-dir`).
//! User values are merged over stock defaults, so a file only needs the keys
//! it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "content"   # Page-tree JSON exports
//! cache_dir = "cache/img"   # Media cache
//! static_dir = "www"        # Static assets checked by `headerimage`
//!
//! [batch]
//! on_error = "skip"         # "skip" or "abort"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::batch::ErrorPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Ingest configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Directory holding page-tree JSON exports.
    pub content_dir: String,
    /// Directory of cached media files.
    pub cache_dir: String,
    /// Root of the static site assets (`/img/...` paths resolve below it).
    pub static_dir: String,
    /// Batch failure handling.
    pub batch: BatchConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            cache_dir: "cache/img".to_string(),
            static_dir: "www".to_string(),
            batch: BatchConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("content_dir", &self.content_dir),
            ("cache_dir", &self.cache_dir),
            ("static_dir", &self.static_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// What a failed page does to the batch.
    pub on_error: ErrorPolicy,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel ingest workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for a batch: every core unless `max_processes` asks for
/// fewer. A cap above the core count has no effect.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(cap) if cap < cores => cap,
        _ => cores,
    }
}

/// `IngestConfig::default()` as a TOML table, the layer a user file is
/// merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(IngestConfig::default())?)
}

/// Lay `overlay` over `base`. Sections such as `[batch]` merge key by key;
/// any other value in `overlay` replaces the one in `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                let value = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, replacement) => replacement,
    }
}

/// Read `<dir>/config.toml`, or `None` when the directory has none.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(dir.join("config.toml")) {
        Ok(text) => Ok(Some(toml::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Apply the user layer (if any) to `base` and turn the result into a
/// validated [`IngestConfig`].
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<IngestConfig, ConfigError> {
    let merged = overlay.into_iter().fold(base, merge_toml);
    let config: IngestConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults plus `<dir>/config.toml`, validated.
pub fn load_config(dir: &Path) -> Result<IngestConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?)
}

/// A fully-commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Blockpress Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory holding page-tree JSON exports, searched recursively for *.json.
content_dir = "content"

# Media cache. Cached images are named by the SHA-256 of their link and
# served as /img/<file name>.
cache_dir = "cache/img"

# Static site root. `headerimage:` directives must name a file below it.
static_dir = "www"

# ---------------------------------------------------------------------------
# Batch
# ---------------------------------------------------------------------------
[batch]
# "skip": leave failed pages out and report them.
# "abort": stop at the first failed page.
on_error = "skip"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel ingest workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
