//! Rhai Script Runtime Implementation
//!
//! This module provides the Rhai-backed [`ScriptRuntime`] used by every
//! compiled transform.
//!
//! ## Evaluation Model
//!
//! The global-variable preamble runs once into a persistent [`Scope`]. The
//! rewritten expression is compiled into an AST that carries the preamble's
//! functions. Each call pushes `time`, `value` and `CHANNEL_VALUES` onto the
//! scope, evaluates the AST and rewinds the scope, so locals declared by the
//! expression disappear while assignments to preamble variables persist.
//!
//! ## Math Functions
//!
//! - `abs`, `sqrt`, `cbrt`, `pow`, `exp`, `ln`, `log` (natural), `log10`, `log2`, `hypot`
//! - `sin`, `cos`, `tan`, `asin`, `acos`, `atan`, `atan2`, `sinh`, `cosh`, `tanh`
//! - `floor`, `ceil`, `round`, `trunc`, `fract`, `clamp`, `min`, `max`, `sign`
//! - `pi()`, `e()`, `is_nan`, `is_finite`, `is_infinite`, `lerp`, `map_range`
//!
//! Every function also accepts integers. Integer division yields a float,
//! so `1 / 2` is `0.5`.
//!
//! ## Filter Steps
//!
//! Stateless; keep the previous output in a preamble variable.
//!
//! - `smooth(current, previous, alpha)` - Exponential smoothing
//! - `lowpass(current, previous, cutoff_hz, dt)` - First-order lowpass
//! - `rate_limit(current, previous, max_rate, dt)` - Limit rate of change
//! - `deadband(value, center, width)` - Snap to `center` inside the band

use crate::config::ScriptLimits;
use crate::error::{Result, TransformError};
use crate::scripting::{ScriptRuntime, ScriptValue, CHANNEL_VALUES_VAR, TIME_VAR, VALUE_VAR};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope, AST};

const UNARY_MATH: &[(&str, fn(f64) -> f64)] = &[
    ("abs", f64::abs),
    ("sqrt", f64::sqrt),
    ("cbrt", f64::cbrt),
    ("exp", f64::exp),
    ("ln", f64::ln),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("floor", f64::floor),
    ("ceil", f64::ceil),
    ("round", f64::round),
    ("trunc", f64::trunc),
    ("fract", f64::fract),
    ("sign", sign),
];

const BINARY_MATH: &[(&str, fn(f64, f64) -> f64)] = &[
    ("pow", f64::powf),
    ("atan2", f64::atan2),
    ("hypot", f64::hypot),
    ("min", f64::min),
    ("max", f64::max),
];

// Filter steps are stateless; the caller keeps the previous sample in globals
const TERNARY_MATH: &[(&str, fn(f64, f64, f64) -> f64)] = &[
    ("clamp", clamp),
    ("lerp", lerp),
    ("smooth", smooth),
    ("deadband", deadband),
];

const QUATERNARY_MATH: &[(&str, fn(f64, f64, f64, f64) -> f64)] =
    &[("lowpass", lowpass), ("rate_limit", rate_limit)];

const PREDICATES: &[(&str, fn(f64) -> bool)] = &[
    ("is_nan", f64::is_nan),
    ("is_finite", f64::is_finite),
    ("is_infinite", f64::is_infinite),
];

type CallResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// Numeric argument of a host function, integers widened
fn arg(value: &Dynamic) -> CallResult<f64> {
    as_number(value)
        .ok_or_else(|| format!("expected a number, got '{}'", value.type_name()).into())
}

/// -1, 0 or 1 (0 for NaN)
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn map_range(x: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    out_lo + (x - in_lo) * (out_hi - out_lo) / (in_hi - in_lo)
}

/// Exponential smoothing step
fn smooth(current: f64, previous: f64, alpha: f64) -> f64 {
    if previous.is_nan() {
        current
    } else {
        let alpha = alpha.clamp(0.0, 1.0);
        alpha * previous + (1.0 - alpha) * current
    }
}

/// First-order lowpass step
fn lowpass(current: f64, previous: f64, cutoff_hz: f64, dt: f64) -> f64 {
    if previous.is_nan() || dt <= 0.0 || cutoff_hz <= 0.0 {
        return current;
    }
    let rc = 1.0 / (std::f64::consts::TAU * cutoff_hz);
    previous + (current - previous) * dt / (rc + dt)
}

fn rate_limit(current: f64, previous: f64, max_rate: f64, dt: f64) -> f64 {
    if previous.is_nan() || dt <= 0.0 {
        return current;
    }
    let step = max_rate * dt;
    previous + (current - previous).clamp(-step, step)
}

fn deadband(x: f64, center: f64, width: f64) -> f64 {
    if (x - center).abs() < width / 2.0 {
        center
    } else {
        x
    }
}

/// Rhai-backed evaluator owned by a single compiled transform
pub struct RhaiRuntime {
    /// The Rhai engine instance
    engine: Engine,
    /// Global variables defined by the preamble
    scope: Scope<'static>,
    /// Compiled preamble, kept for `reset`
    preamble: Option<AST>,
    /// Functions defined by the preamble
    functions: AST,
    /// Compiled expression body
    expression: Option<AST>,
    /// Expression merged with the preamble functions
    callable: Option<AST>,
    /// Globals saved by `checkpoint`
    saved: Option<Scope<'static>>,
}

impl RhaiRuntime {
    /// Create a new runtime with the given safety limits
    pub fn new(limits: &ScriptLimits) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, limits);

        Self {
            engine,
            scope: Scope::new(),
            preamble: None,
            functions: AST::empty(),
            expression: None,
            callable: None,
            saved: None,
        }
    }

    /// Apply the safety limits and register the host math library
    fn configure_engine(engine: &mut Engine, limits: &ScriptLimits) {
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_operations(limits.max_operations);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        // Built-in operators would truncate `int / int`
        engine.set_fast_operators(false);
        engine.register_fn("/", |a: i64, b: i64| a as f64 / b as f64);

        // Each function gets an exact f64 overload and a Dynamic fallback
        // that accepts integers
        for &(name, f) in UNARY_MATH {
            engine.register_fn(name, f);
            engine.register_fn(name, move |x: Dynamic| -> CallResult<f64> { Ok(f(arg(&x)?)) });
        }
        for &(name, f) in BINARY_MATH {
            engine.register_fn(name, f);
            engine.register_fn(name, move |x: Dynamic, y: Dynamic| -> CallResult<f64> {
                Ok(f(arg(&x)?, arg(&y)?))
            });
        }
        for &(name, f) in PREDICATES {
            engine.register_fn(name, f);
            engine.register_fn(name, move |x: Dynamic| -> CallResult<bool> { Ok(f(arg(&x)?)) });
        }
        for &(name, f) in TERNARY_MATH {
            engine.register_fn(name, f);
            engine.register_fn(
                name,
                move |x: Dynamic, y: Dynamic, z: Dynamic| -> CallResult<f64> {
                    Ok(f(arg(&x)?, arg(&y)?, arg(&z)?))
                },
            );
        }
        for &(name, f) in QUATERNARY_MATH {
            engine.register_fn(name, f);
            engine.register_fn(
                name,
                move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| -> CallResult<f64> {
                    Ok(f(arg(&a)?, arg(&b)?, arg(&c)?, arg(&d)?))
                },
            );
        }

        engine.register_fn("pi", || std::f64::consts::PI);
        engine.register_fn("e", || std::f64::consts::E);
        engine.register_fn("map_range", map_range);
        engine.register_fn(
            "map_range",
            |x: Dynamic, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| -> CallResult<f64> {
                Ok(map_range(arg(&x)?, arg(&a)?, arg(&b)?, arg(&c)?, arg(&d)?))
            },
        );
    }

    fn run_preamble(&self, preamble: &AST) -> Result<Scope<'static>> {
        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, preamble)
            .map_err(|e| TransformError::Compile(format!("global variables: {}", e)))?;
        Ok(scope)
    }

    fn relink(&mut self) {
        self.callable = self
            .expression
            .as_ref()
            .map(|expression| self.functions.merge(expression));
    }
}

impl ScriptRuntime for RhaiRuntime {
    fn load_globals(&mut self, source: &str) -> Result<()> {
        let preamble = self
            .engine
            .compile(source)
            .map_err(|e| TransformError::Compile(format!("global variables: {}", e)))?;

        self.scope = self.run_preamble(&preamble)?;
        self.functions = preamble.clone_functions_only();
        self.preamble = Some(preamble);
        self.relink();
        Ok(())
    }

    fn bind(&mut self, expression: &str) -> Result<()> {
        let ast = self
            .engine
            .compile_with_scope(&self.scope, expression)
            .map_err(|e| TransformError::Compile(format!("expression: {}", e)))?;

        self.expression = Some(ast);
        self.relink();
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.scope = match &self.preamble {
            Some(preamble) => self.run_preamble(preamble)?,
            None => Scope::new(),
        };
        Ok(())
    }

    fn checkpoint(&mut self) {
        self.saved = Some(self.scope.clone());
    }

    fn restore(&mut self) {
        if let Some(scope) = self.saved.take() {
            self.scope = scope;
        }
    }

    fn call(&mut self, time: f64, value: f64, channel_values: &[f64]) -> Result<ScriptValue> {
        let Some(callable) = self.callable.as_ref() else {
            return Err(TransformError::Script("no expression bound".to_string()));
        };

        let channels: Array = channel_values
            .iter()
            .map(|&v| Dynamic::from_float(v))
            .collect();

        let base = self.scope.len();
        self.scope
            .push(TIME_VAR, time)
            .push(VALUE_VAR, value)
            .push(CHANNEL_VALUES_VAR, channels);

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, callable);
        self.scope.rewind(base);

        result
            .map(to_script_value)
            .map_err(TransformError::from_rhai_error)
    }
}

impl Default for RhaiRuntime {
    fn default() -> Self {
        Self::new(&ScriptLimits::default())
    }
}

impl std::fmt::Debug for RhaiRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiRuntime")
            .field("globals", &self.scope.len())
            .field("bound", &self.callable.is_some())
            .finish()
    }
}

fn as_number(value: &Dynamic) -> Option<f64> {
    match value.as_float() {
        Ok(f) => Some(f),
        Err(_) => value.as_int().ok().map(|i| i as f64),
    }
}

fn to_script_value(value: Dynamic) -> ScriptValue {
    if let Some(number) = as_number(&value) {
        return ScriptValue::Number(number);
    }

    let type_name = value.type_name().to_string();
    if value.is_array() {
        if let Some(items) = value.try_cast::<Array>() {
            return ScriptValue::Array(
                items
                    .iter()
                    .map(|item| as_number(item).unwrap_or(f64::NAN))
                    .collect(),
            );
        }
    } else if value.is_map() {
        if let Some(map) = value.try_cast::<Map>() {
            return ScriptValue::Object(
                map.iter()
                    .map(|(key, item)| (key.to_string(), as_number(item).unwrap_or(f64::NAN)))
                    .collect(),
            );
        }
    }

    ScriptValue::Unsupported(type_name)
}
