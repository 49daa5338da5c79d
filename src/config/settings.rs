//! Settings sections of the engine configuration
//!
//! # Main Types
//!
//! - [`ScriptLimits`] - Safety limits applied to every Rhai runtime
//! - [`LoggingConfig`] - Log filter and optional log file directory

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,datavis_math=debug";

/// Safety limits for the embedded script engine.
///
/// Every derived signal owns its own runtime, and each per-sample call is
/// bounded by these limits so that a runaway expression fails instead of
/// stalling an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    /// Maximum nesting depth of expressions at global level
    pub max_expr_depth: usize,
    /// Maximum nesting depth of expressions inside functions
    pub max_function_expr_depth: usize,
    /// Maximum depth of function calls
    pub max_call_levels: usize,
    /// Maximum number of operations for a single evaluation
    pub max_operations: u64,
    /// Maximum length of strings
    pub max_string_size: usize,
    /// Maximum length of arrays
    pub max_array_size: usize,
    /// Maximum number of properties in object maps
    pub max_map_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_expr_depth: 64,
            max_function_expr_depth: 64,
            max_call_levels: 32,
            max_operations: 50_000,
            max_string_size: 10_000,
            max_array_size: 1_000,
            max_map_size: 1_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    /// Directory for daily-rolling log files (None = stderr only)
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}
