//! Tool configuration module.
//!
//! Handles loading, validating, and merging `gridcrop.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of keys.
//!
//! ## Config File Location
//!
//! `gridcrop.toml` in the working directory, or any file passed with
//! `--config`. The publish record (owner, repo, token) is *not* stored here;
//! see [`repo_config`](crate::repo_config).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [crop]
//! quality = 92              # JPEG quality (1-100)
//! placeholder = [224, 224]  # Size assumed for remote images until probed
//!
//! [preview]
//! columns = 3               # 1-12
//! rows = 0                  # 0 = auto, otherwise 1-12
//! gap = 6                   # Pixels between cells
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [preview]
//! columns = 4
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Dimensions, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "gridcrop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `gridcrop.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Crop encoding settings.
    pub crop: CropConfig,
    /// Preview grid layout.
    pub preview: PreviewConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.crop.quality) {
            return Err(ConfigError::Validation(
                "crop.quality must be 1-100".into(),
            ));
        }
        if self.crop.placeholder[0] == 0 || self.crop.placeholder[1] == 0 {
            return Err(ConfigError::Validation(
                "crop.placeholder values must be non-zero".into(),
            ));
        }
        if !(1..=12).contains(&self.preview.columns) {
            return Err(ConfigError::Validation(
                "preview.columns must be 1-12".into(),
            ));
        }
        if self.preview.rows > 12 {
            return Err(ConfigError::Validation(
                "preview.rows must be 0 (auto) or 1-12".into(),
            ));
        }
        Ok(())
    }
}

/// Crop encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// JPEG quality for cropped output (1 = worst, 100 = best).
    pub quality: u32,
    /// `[width, height]` assumed for a remote image until its probe resolves.
    pub placeholder: [u32; 2],
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            quality: 92,
            placeholder: [224, 224],
        }
    }
}

impl CropConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    pub fn placeholder(&self) -> Dimensions {
        Dimensions::new(self.placeholder[0], self.placeholder[1])
    }
}

/// Preview grid layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub columns: u32,
    /// `0` lets the grid add as many rows as the items need.
    pub rows: u32,
    /// Gap between cells, in pixels.
    pub gap: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            rows: 0,
            gap: 6,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel export workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolConfig::default()).expect("default config must serialize")
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

/// Load a TOML file as a raw value. `Ok(None)` if the file does not exist.
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
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `gridcrop.toml` from the given directory.
pub fn load_config(dir: &Path) -> Result<ToolConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Load an explicit config file, merged over stock defaults.
pub fn load_config_file(path: &Path) -> Result<ToolConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `gridcrop.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gridcrop configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# GitHub publishing settings are stored separately; see `gridcrop config show`.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Cropping
# ---------------------------------------------------------------------------
[crop]
# JPEG quality for cropped output (1 = worst, 100 = best).
quality = 92

# [width, height] assumed for remote images until their real size is known.
# Also the crop size before any image is added.
placeholder = [224, 224]

# ---------------------------------------------------------------------------
# Preview grid
# ---------------------------------------------------------------------------
[preview]
# Number of columns (1-12).
columns = 3

# Number of rows. 0 adds rows as needed, otherwise 1-12.
rows = 0

# Gap between cells in pixels.
gap = 6

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel export workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
