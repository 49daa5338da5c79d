//! Rhai Scripting Runtime for Derived Signals
//!
//! This module provides the evaluator that derived-signal expressions run on.
//! The evaluator sits behind the [`ScriptRuntime`] trait so the incremental
//! engine never touches Rhai types directly; [`RhaiRuntime`] is the
//! production implementation.
//!
//! ## Variables
//!
//! The following variables are in scope for every expression:
//!
//! - `time` - Timestamp of the linked-series sample being processed
//! - `value` - Value of the linked-series sample (also what `$$linked$$` expands to)
//! - `CHANNEL_VALUES` - Aligned values of the auxiliary channels (what `$$other$$` expands to)
//!
//! Variables declared with `let` in the global-variable preamble stay in scope
//! across samples, so expressions can keep state (previous values, accumulators).
//! Functions declared with `fn` in the preamble can be called from the expression;
//! like all Rhai functions they only see their own parameters.
//!
//! ## Results
//!
//! An expression evaluates to one of:
//!
//! - a number - one output series named after the definition
//! - an array of numbers - one output series per element (`name.0`, `name.1`, ...)
//! - an object map - one output series per key (`name/key`), keys in sorted order
//!
//! ## Example Expressions
//!
//! Magnitude of a 2D vector, `x` being the linked series:
//! ```rhai
//! sqrt(value * value + $$y$$ * $$y$$)
//! ```
//!
//! Split a signal into positive and negative parts:
//! ```rhai
//! #{ pos: max(value, 0.0), neg: min(value, 0.0) }
//! ```
//!
//! Derivative, keeping state in the preamble:
//! ```rhai
//! // preamble: let prev_t = 0.0; let prev_v = 0.0; let first = true;
//! let d = if first || time <= prev_t { 0.0 } else { (value - prev_v) / (time - prev_t) };
//! first = false;
//! prev_t = time;
//! prev_v = value;
//! d
//! ```

mod engine;

pub use engine::RhaiRuntime;

use crate::error::Result;

/// Name of the variable holding the linked-series sample timestamp
pub const TIME_VAR: &str = "time";

/// Name of the variable holding the linked-series sample value
pub const VALUE_VAR: &str = "value";

/// Name of the array holding the aligned auxiliary channel values
pub const CHANNEL_VALUES_VAR: &str = "CHANNEL_VALUES";

/// Host-side view of a value returned by an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// A plain number (integers are widened to f64)
    Number(f64),
    /// An indexable sequence; non-numeric elements read as NaN
    Array(Vec<f64>),
    /// A key-value structure, in the runtime's natural iteration order
    Object(Vec<(String, f64)>),
    /// Anything else, carrying the runtime's type name
    Unsupported(String),
}

impl ScriptValue {
    pub fn is_number(&self) -> bool {
        matches!(self, ScriptValue::Number(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ScriptValue::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ScriptValue::Object(_))
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            ScriptValue::Number(_) => "a number".to_string(),
            ScriptValue::Array(values) => format!("an array of length {}", values.len()),
            ScriptValue::Object(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                format!("an object with keys [{}]", keys.join(", "))
            }
            ScriptValue::Unsupported(type_name) => format!("a value of type '{}'", type_name),
        }
    }
}

/// Capability interface of the embedded expression evaluator.
///
/// A runtime is owned by exactly one compiled transform and is never called
/// reentrantly.
#[cfg_attr(test, mockall::automock)]
pub trait ScriptRuntime {
    /// Evaluate the global-variable preamble in a fresh context
    fn load_globals(&mut self, source: &str) -> Result<()>;

    /// Bind the rewritten expression as the per-sample callable
    fn bind(&mut self, expression: &str) -> Result<()>;

    /// Discard state accumulated by calls, re-running the preamble
    fn reset(&mut self) -> Result<()>;

    /// Remember the current global state, replacing any earlier checkpoint
    fn checkpoint(&mut self);

    /// Return the global state to the last checkpoint
    fn restore(&mut self);

    /// Invoke the callable for one sample
    fn call(&mut self, time: f64, value: f64, channel_values: &[f64]) -> Result<ScriptValue>;
}

/// Built-in snippets for common derived signals
pub mod builtins {
    use crate::document::Snippet;

    /// Preamble shared by the stateful builtins
    pub const PREV_SAMPLE_GLOBALS: &str = r#"
let first = true;
let prev_t = 0.0;
let prev_v = 0.0;
"#;

    /// Rate of change of the linked series
    pub const DERIVATIVE: &str = r#"
let d = if first || time <= prev_t { 0.0 } else { (value - prev_v) / (time - prev_t) };
first = false;
prev_t = time;
prev_v = value;
d
"#;

    /// Accumulator for the trapezoidal integral
    pub const INTEGRAL_GLOBALS: &str = r#"
let first = true;
let prev_t = 0.0;
let prev_v = 0.0;
let area = 0.0;
"#;

    /// Trapezoidal integral of the linked series
    pub const INTEGRAL: &str = r#"
if !first {
    area += (value + prev_v) * (time - prev_t) / 2.0;
}
first = false;
prev_t = time;
prev_v = value;
area
"#;

    /// Offset removal state
    pub const REMOVE_OFFSET_GLOBALS: &str = r#"
let first = true;
let offset = 0.0;
"#;

    /// Subtract the first sample from every sample
    pub const REMOVE_OFFSET: &str = r#"
if first {
    offset = value;
    first = false;
}
value - offset
"#;

    /// Radians to degrees
    pub const RAD_TO_DEG: &str = "value * 180.0 / pi()";

    /// Degrees to radians
    pub const DEG_TO_RAD: &str = "value * pi() / 180.0";

    /// Sine and cosine of the linked series as two outputs
    pub const SIN_COS: &str = "[sin(value), cos(value)]";

    /// Positive and negative parts as two keyed outputs
    pub const SPLIT_SIGN: &str = "#{ neg: min(value, 0.0), pos: max(value, 0.0) }";

    /// List of all built-in snippets
    pub fn all() -> Vec<Snippet> {
        vec![
            Snippet::new("derivative", PREV_SAMPLE_GLOBALS, DERIVATIVE),
            Snippet::new("integral", INTEGRAL_GLOBALS, INTEGRAL),
            Snippet::new("remove_offset", REMOVE_OFFSET_GLOBALS, REMOVE_OFFSET),
            Snippet::new("rad_to_deg", "", RAD_TO_DEG),
            Snippet::new("deg_to_rad", "", DEG_TO_RAD),
            Snippet::new("sin_cos", "", SIN_COS),
            Snippet::new("split_sign", "", SPLIT_SIGN),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptLimits;

    #[test]
    fn test_script_value_predicates() {
        assert!(ScriptValue::Number(1.0).is_number());
        assert!(ScriptValue::Array(vec![]).is_array());
        assert!(ScriptValue::Object(vec![]).is_object());
        assert!(!ScriptValue::Unsupported("bool".into()).is_number());
    }

    #[test]
    fn test_describe() {
        let value = ScriptValue::Object(vec![("x".into(), 1.0), ("y".into(), 2.0)]);
        assert_eq!(value.describe(), "an object with keys [x, y]");
        assert_eq!(
            ScriptValue::Array(vec![1.0, 2.0]).describe(),
            "an array of length 2"
        );
    }

    #[test]
    fn test_builtin_snippets_compile() {
        for snippet in builtins::all() {
            let mut runtime = RhaiRuntime::new(&ScriptLimits::default());
            let result = runtime
                .load_globals(&snippet.global_vars)
                .and_then(|_| runtime.bind(&snippet.equation))
                .and_then(|_| runtime.call(0.0, 1.0, &[]));
            assert!(
                result.is_ok(),
                "Built-in '{}' failed: {:?}",
                snippet.name,
                result.err()
            );
        }
    }

    #[test]
    fn test_builtin_derivative() {
        let mut runtime = RhaiRuntime::new(&ScriptLimits::default());
        runtime.load_globals(builtins::PREV_SAMPLE_GLOBALS).unwrap();
        runtime.bind(builtins::DERIVATIVE).unwrap();

        assert_eq!(runtime.call(0.0, 10.0, &[]).unwrap(), ScriptValue::Number(0.0));
        assert_eq!(runtime.call(0.5, 20.0, &[]).unwrap(), ScriptValue::Number(20.0));
        assert_eq!(runtime.call(1.0, 20.0, &[]).unwrap(), ScriptValue::Number(0.0));
    }

    #[test]
    fn test_builtin_integral() {
        let mut runtime = RhaiRuntime::new(&ScriptLimits::default());
        runtime.load_globals(builtins::INTEGRAL_GLOBALS).unwrap();
        runtime.bind(builtins::INTEGRAL).unwrap();

        // Constant 2.0 over 3 seconds
        let mut last = ScriptValue::Number(f64::NAN);
        for t in 0..=3 {
            last = runtime.call(t as f64, 2.0, &[]).unwrap();
        }
        assert_eq!(last, ScriptValue::Number(6.0));
    }
}
