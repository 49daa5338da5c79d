//! Error handling for DataVis-Math
//!
//! This module defines the error type shared by the preprocessor, the script
//! runtime, the incremental evaluator and the definition documents, plus a
//! Result alias for use throughout the crate.

use thiserror::Error;

/// Main error type for derived-signal operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Malformed `$$channel$$` macro in an expression
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Global variables or expression failed to compile or introspect
    #[error("Compile error: {0}")]
    Compile(String),

    /// An auxiliary channel is not present in the series registry
    #[error("Invalid channel name: '{0}' not found")]
    MissingChannel(String),

    /// A sample produced a result that does not match the introspected shape
    #[error("Shape mismatch in '{name}' at x = {x}: expected {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        x: f64,
        expected: String,
        actual: String,
    },

    /// Errors raised by the script runtime while evaluating a sample
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to definition/snippet documents
    #[error("Failed to parse document, error {message} at line {line}")]
    Document { line: u32, message: String },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TransformError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        TransformError::Script(err.to_string())
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &TransformError {
        match self {
            TransformError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for DataVis-Math operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
