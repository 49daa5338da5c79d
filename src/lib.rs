//! # DataVis-Math: Derived-Signal Engine
//!
//! Scripted math channels computed incrementally from time series. A derived
//! signal is defined by a name, a *linked* series, a global-variable preamble
//! and an expression that may reference other series as `$$name$$`. The engine
//! keeps the derived output series in step with the linked series as it grows.
//!
//! ## Architecture
//!
//! - **Types**: `Series` / `SeriesMap`, the shared registry of named time series
//! - **Scripting**: Rhai-based expression runtime behind the `ScriptRuntime` trait
//! - **Transform**: macro rewriting, alignment, output shapes and the incremental evaluator
//! - **Document**: XML persistence of definitions and snippet libraries
//!
//! ## Configuration
//!
//! Script limits and logging are read from `math.toml` in the platform config
//! directory under `dev.hxyulin.datavis-math` (see [`config`]).
//!
//! ## Example
//!
//! ```
//! use datavis_math::{CompiledTransform, Definition, Series, SeriesMap};
//!
//! let mut registry = SeriesMap::new();
//! registry.insert(Series::from_points("speed", [(0.0, 10.0), (1.0, 20.0)]));
//! registry.insert(Series::from_points("scale", [(0.0, 2.0)]));
//!
//! let definition = Definition::new("scaled", "speed", "", "$$speed$$ * $$scale$$");
//! let mut transform = CompiledTransform::compile(definition)?;
//! transform.register(&mut registry);
//! transform.update(&mut registry)?;
//!
//! let scaled: Vec<f64> = registry.find("scaled").unwrap().iter().map(|p| p.y).collect();
//! assert_eq!(scaled, vec![20.0, 40.0]);
//! # Ok::<(), datavis_math::TransformError>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod scripting;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use config::{EngineConfig, ScriptLimits};
pub use document::{DefinitionMap, Snippet};
pub use error::{Result, TransformError};
pub use scripting::{RhaiRuntime, ScriptRuntime, ScriptValue};
pub use transform::{CompiledTransform, Definition, OutputShape, TransformSet};
pub use types::{Point, Series, SeriesMap, SeriesSnapshot};
