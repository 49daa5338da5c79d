//! Durable description of a derived signal.

use crate::document::Snippet;
use serde::{Deserialize, Serialize};

/// Name, linked series, preamble and expression of a derived signal.
///
/// Definitions are immutable; changing one means building a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    name: String,
    linked_series: String,
    global_vars: String,
    expression: String,
}

impl Definition {
    pub fn new(
        name: impl Into<String>,
        linked_series: impl Into<String>,
        global_vars: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            linked_series: linked_series.into(),
            global_vars: global_vars.into(),
            expression: expression.into(),
        }
    }

    /// Instantiate a snippet against a linked series, named after the snippet
    pub fn from_snippet(linked_series: impl Into<String>, snippet: &Snippet) -> Self {
        Self::new(
            snippet.name.clone(),
            linked_series,
            snippet.global_vars.clone(),
            snippet.equation.clone(),
        )
    }

    /// Name of the derived signal (also the base name of its outputs)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the series whose samples drive evaluation
    pub fn linked_series(&self) -> &str {
        &self.linked_series
    }

    /// Preamble source evaluated once before the first sample
    pub fn global_vars(&self) -> &str {
        &self.global_vars
    }

    /// Raw expression text, still containing `$$name$$` macros
    pub fn expression(&self) -> &str {
        &self.expression
    }
}
