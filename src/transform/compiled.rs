//! Compiled derived signal and its incremental evaluator.
//!
//! A [`CompiledTransform`] owns the script runtime for one definition and the
//! high-water-mark of the last processed linked-series sample.
//!
//! # Lifecycle
//!
//! ```text
//! compile ──► register ──► update / rebuild (repeatable) ──► remove
//! ```
//!
//! Outputs created by [`CompiledTransform::register`] stay *staged* until a
//! pass succeeds. If a pass fails while outputs are still staged they are
//! removed from the registry again, so a definition that never evaluated
//! cleanly leaves nothing behind. Series that already existed under an output
//! name are never removed; they keep their contents until the first
//! successful pass replaces them.
//!
//! The script's global variables follow the same rule as the outputs: a failed
//! pass puts them back to where they were before it started.

use crate::config::ScriptLimits;
use crate::error::{Result, TransformError};
use crate::scripting::{RhaiRuntime, ScriptRuntime};
use crate::transform::align::SampleAligner;
use crate::transform::definition::Definition;
use crate::transform::macros::{rewrite_channels, RewrittenExpression};
use crate::transform::shape::OutputShape;
use crate::types::{Point, SeriesMap};

/// Value `time` takes during the introspection call
const INTROSPECTION_TIME: f64 = 0.0;
/// Value `value` and every channel take during the introspection call
const INTROSPECTION_VALUE: f64 = 1.0;

/// Points computed by one pass, not yet written to the registry
struct StagedPass {
    columns: Vec<Vec<Point>>,
    last_x: Option<f64>,
    domain_bound: Option<f64>,
}

/// A definition bound to a script runtime, ready to evaluate
pub struct CompiledTransform<R: ScriptRuntime = RhaiRuntime> {
    definition: Definition,
    rewritten: RewrittenExpression,
    shape: OutputShape,
    output_names: Vec<String>,
    runtime: R,
    high_water_mark: f64,
    /// Outputs this transform created that no pass has committed yet
    staged: Vec<String>,
    /// The next committed pass replaces the outputs instead of appending
    replace_outputs: bool,
}

impl CompiledTransform<RhaiRuntime> {
    /// Compile a definition with the default script limits
    pub fn compile(definition: Definition) -> Result<Self> {
        Self::compile_with_runtime(definition, RhaiRuntime::default())
    }

    /// Compile a definition with custom script limits
    pub fn compile_with_limits(definition: Definition, limits: &ScriptLimits) -> Result<Self> {
        Self::compile_with_runtime(definition, RhaiRuntime::new(limits))
    }
}

impl<R: ScriptRuntime> CompiledTransform<R> {
    /// Compile a definition on the given runtime.
    ///
    /// Rewrites the channel macros, evaluates the preamble, binds the
    /// expression and makes one introspection call to fix the output shape.
    pub fn compile_with_runtime(definition: Definition, mut runtime: R) -> Result<Self> {
        let rewritten = rewrite_channels(definition.expression(), definition.linked_series())?;

        runtime.load_globals(definition.global_vars())?;
        runtime.bind(&rewritten.text)?;

        let probe = vec![INTROSPECTION_VALUE; rewritten.channels.len()];
        let value = runtime
            .call(INTROSPECTION_TIME, INTROSPECTION_VALUE, &probe)
            .map_err(|e| match e {
                TransformError::Compile(_) => e,
                other => TransformError::Compile(format!("introspection failed: {}", other)),
            })?;
        let shape = OutputShape::from_value(&value)?;
        let output_names = shape.output_names(definition.name());

        // Introspection must not leak into the first real sample
        runtime.reset()?;

        tracing::debug!(
            "Compiled '{}' (linked '{}', channels {:?}) -> outputs {:?}",
            definition.name(),
            definition.linked_series(),
            rewritten.channels,
            output_names
        );

        Ok(Self {
            definition,
            rewritten,
            shape,
            output_names,
            runtime,
            high_water_mark: f64::NEG_INFINITY,
            staged: Vec::new(),
            replace_outputs: true,
        })
    }

    /// Create the output series that are missing from the registry.
    ///
    /// Created outputs stay staged until the next successful pass. Outputs
    /// that already existed are left alone until that pass replaces them.
    pub fn register(&mut self, registry: &mut SeriesMap) {
        for name in &self.output_names {
            let (_, created) = registry.get_or_create(name);
            if created && !self.staged.contains(name) {
                self.staged.push(name.clone());
            }
        }
        self.high_water_mark = f64::NEG_INFINITY;
        self.replace_outputs = true;
    }

    /// Evaluate every linked sample newer than the high-water-mark.
    ///
    /// Returns the number of samples appended to each output. A missing
    /// linked series is not an error; the pass does nothing.
    pub fn update(&mut self, registry: &mut SeriesMap) -> Result<usize> {
        let mark = self.high_water_mark;
        self.runtime.checkpoint();
        match self.evaluate(registry, mark) {
            Ok(Some(pass)) => {
                let replace = self.replace_outputs;
                Ok(self.commit(registry, pass, replace))
            }
            Ok(None) => {
                self.staged.clear();
                Ok(0)
            }
            Err(e) => {
                self.rollback(registry, &e);
                Err(e)
            }
        }
    }

    /// Re-evaluate the whole linked series from scratch.
    ///
    /// Global variables are reset first. On success the outputs are replaced;
    /// on failure they, the high-water-mark and the global variables keep
    /// their previous contents.
    pub fn rebuild(&mut self, registry: &mut SeriesMap) -> Result<usize> {
        if !registry.contains(self.definition.linked_series()) {
            self.staged.clear();
            return Ok(0);
        }

        self.runtime.checkpoint();
        let result = self
            .runtime
            .reset()
            .and_then(|_| self.evaluate(registry, f64::NEG_INFINITY));

        match result {
            Ok(Some(pass)) => Ok(self.commit(registry, pass, true)),
            Ok(None) => {
                self.staged.clear();
                Ok(0)
            }
            Err(e) => {
                self.rollback(registry, &e);
                Err(e)
            }
        }
    }

    /// Remove every output series from the registry
    pub fn remove(self, registry: &mut SeriesMap) {
        for name in &self.output_names {
            registry.remove(name);
        }
        tracing::debug!("Removed '{}'", self.definition.name());
    }

    fn evaluate(&mut self, registry: &SeriesMap, mark: f64) -> Result<Option<StagedPass>> {
        let Some(linked) = registry.find(self.definition.linked_series()) else {
            tracing::trace!(
                "'{}': linked series '{}' absent, nothing to do",
                self.definition.name(),
                self.definition.linked_series()
            );
            return Ok(None);
        };

        let mut aligner = SampleAligner::resolve(registry, &self.rewritten.channels)?;

        let start = linked.first_index_after(mark);
        let pending = linked.len().saturating_sub(start);
        let mut columns: Vec<Vec<Point>> = (0..self.output_names.len())
            .map(|_| Vec::with_capacity(pending))
            .collect();
        let mut last_x = None;

        for point in linked.iter().skip(start) {
            let channel_values = aligner.align(point.x);
            let value = self.runtime.call(point.x, point.y, channel_values)?;
            let ys = self
                .shape
                .extract(value)
                .map_err(|actual| TransformError::ShapeMismatch {
                    name: self.definition.name().to_string(),
                    x: point.x,
                    expected: self.shape.describe(),
                    actual,
                })?;

            for (column, y) in columns.iter_mut().zip(ys) {
                column.push(Point::new(point.x, y));
            }
            last_x = Some(point.x);
        }

        tracing::trace!(
            "'{}': evaluated {} samples after x = {}",
            self.definition.name(),
            pending,
            mark
        );

        Ok(Some(StagedPass {
            columns,
            last_x,
            domain_bound: linked.value_domain_bound(),
        }))
    }

    fn commit(&mut self, registry: &mut SeriesMap, pass: StagedPass, replace: bool) -> usize {
        let appended = pass.columns.first().map_or(0, Vec::len);

        for (name, column) in self.output_names.iter().zip(pass.columns) {
            let (series, _) = registry.get_or_create(name);
            if replace {
                series.clear();
            }
            series.set_value_domain_bound(pass.domain_bound);
            for point in column {
                series.push_back(point);
            }
        }

        if replace {
            self.high_water_mark = pass.last_x.unwrap_or(f64::NEG_INFINITY);
        } else if let Some(x) = pass.last_x {
            self.high_water_mark = x;
        }
        self.staged.clear();
        self.replace_outputs = false;
        appended
    }

    fn rollback(&mut self, registry: &mut SeriesMap, error: &TransformError) {
        self.runtime.restore();

        if self.staged.is_empty() {
            tracing::warn!("'{}' failed: {}", self.definition.name(), error);
            return;
        }

        tracing::warn!(
            "'{}' failed, removing outputs {:?}: {}",
            self.definition.name(),
            self.staged,
            error
        );
        for name in self.staged.drain(..) {
            registry.remove(&name);
        }
    }

    /// Name of the derived signal
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Names of the output series, in shape order
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn linked_series_name(&self) -> &str {
        self.definition.linked_series()
    }

    pub fn global_vars(&self) -> &str {
        self.definition.global_vars()
    }

    /// Raw expression, as written
    pub fn expression(&self) -> &str {
        self.definition.expression()
    }

    /// Auxiliary channels, indexed by `CHANNEL_VALUES` slot
    pub fn channels(&self) -> &[String] {
        &self.rewritten.channels
    }

    /// Expression after macro rewriting
    pub fn rewritten_expression(&self) -> &str {
        &self.rewritten.text
    }

    pub fn shape(&self) -> &OutputShape {
        &self.shape
    }

    /// Timestamp of the last linked sample processed (-inf before any)
    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }
}

impl<R: ScriptRuntime> std::fmt::Debug for CompiledTransform<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTransform")
            .field("definition", &self.definition)
            .field("channels", &self.rewritten.channels)
            .field("output_names", &self.output_names)
            .field("high_water_mark", &self.high_water_mark)
            .finish()
    }
}
