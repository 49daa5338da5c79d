//! Configuration module for DataVis-Math
//!
//! This module handles the engine configuration:
//! - Script engine safety limits
//! - Logging filter and log file location
//!
//! # Config Location
//!
//! Without an explicit path the configuration is read from the
//! platform-appropriate config directory:
//! - **Linux**: `~/.config/dev.hxyulin.datavis-math/math.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.datavis-math/math.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.datavis-math\math.toml`
//!
//! # Example
//!
//! ```toml
//! [limits]
//! max_operations = 100000
//!
//! [logging]
//! filter = "info,datavis_math=trace"
//! directory = "/tmp/datavis-math-logs"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, TransformError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.datavis-math";

/// Config filename
pub const CONFIG_FILE: &str = "math.toml";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Engine configuration stored as TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Script engine safety limits
    pub limits: ScriptLimits,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Platform default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        default_config_path()
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TransformError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            TransformError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load the config at `path` (or the default location), returning defaults if
    /// the file does not exist or cannot be parsed
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Save config file to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TransformError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TransformError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            TransformError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
