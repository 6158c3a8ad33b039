//! Generator configuration.
//!
//! Handles loading, validating, and merging `pagewright.toml`. The loaded
//! [`GeneratorConfig`] is an ordinary value handed to
//! [`SiteGenerator::new`](crate::generate::SiteGenerator::new); nothing reads
//! configuration from globals, so tests can run isolated generators side by
//! side with distinct roots.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_root = "webroot"   # Directory the site is generated into
//! upload_root = "uploads"   # Base for relative media source paths
//!
//! [generation]
//! # max_workers = 4         # Parallel record pipelines (omit for auto = CPU cores)
//! atomic_writes = true      # Write via temp file + rename
//! ```
//!
//! Config files are sparse: the user file is merged over the stock defaults
//! key by key, so a file containing only `output_root = "/srv/www"` is
//! complete. Unknown keys are rejected to catch typos early.

use crate::artifact::WriteMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
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

/// Generator configuration loaded from `pagewright.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Root of all generated artifacts.
    pub output_root: PathBuf,
    /// Base directory for media sources stored as relative paths.
    pub upload_root: PathBuf,
    /// Worker pool and write settings.
    pub generation: GenerationConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("webroot"),
            upload_root: PathBuf::from("uploads"),
            generation: GenerationConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// A default config with explicit roots.
    pub fn with_roots(output_root: impl Into<PathBuf>, upload_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            upload_root: upload_root.into(),
            ..Self::default()
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_root must not be empty".into(),
            ));
        }
        if self.upload_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "upload_root must not be empty".into(),
            ));
        }
        if self.generation.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "generation.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.generation.atomic_writes {
            WriteMode::Atomic
        } else {
            WriteMode::Direct
        }
    }

    /// Where to read a media file's original from.
    ///
    /// Absolute sources are used as-is; relative ones live under `upload_root`.
    pub fn media_source(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.upload_root.join(source)
        }
    }
}

/// Worker pool and write settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Maximum number of record pipelines running at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
    /// Write artifacts through a temp file and rename.
    pub atomic_writes: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            atomic_writes: true,
        }
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &GenerationConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock default config as a `toml::Value::Table`, the base layer that
/// user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GeneratorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but is
/// not valid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GeneratorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file is
/// absent.
pub fn load_config(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// A fully-commented stock `pagewright.toml` (printed by `gen-config`).
pub fn stock_config_toml() -> &'static str {
    r##"# pagewright configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory the site is generated into. Point the web server here.
output_root = "webroot"

# Base directory for media sources stored as relative paths.
# Absolute media source paths are used as-is.
upload_root = "uploads"

# ---------------------------------------------------------------------------
# Generation
# ---------------------------------------------------------------------------
[generation]
# Maximum record pipelines running at once.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4

# Write each artifact to a temporary file and rename it into place, so a
# web server never serves a half-written file.
atomic_writes = true
"##
}
