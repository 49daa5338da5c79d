//! Output shape of a derived signal.

use crate::error::{Result, TransformError};
use crate::scripting::ScriptValue;

/// Layout of an expression's result, fixed by the introspection call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputShape {
    /// One output named after the definition
    Scalar,
    /// One output per array element, `name.0 .. name.(len-1)`
    Vector(usize),
    /// One output per key, `name/key`, in the given order
    Keyed(Vec<String>),
}

impl OutputShape {
    /// Shape of an introspection result
    pub fn from_value(value: &ScriptValue) -> Result<Self> {
        match value {
            ScriptValue::Number(_) => Ok(OutputShape::Scalar),
            ScriptValue::Array(items) => Ok(OutputShape::Vector(items.len())),
            ScriptValue::Object(entries) => Ok(OutputShape::Keyed(
                entries.iter().map(|(key, _)| key.clone()).collect(),
            )),
            ScriptValue::Unsupported(_) => Err(TransformError::Compile(format!(
                "expression must return a number, an array or an object, got {}",
                value.describe()
            ))),
        }
    }

    /// Number of output series
    pub fn arity(&self) -> usize {
        match self {
            OutputShape::Scalar => 1,
            OutputShape::Vector(len) => *len,
            OutputShape::Keyed(keys) => keys.len(),
        }
    }

    /// Output series names derived from `base`
    pub fn output_names(&self, base: &str) -> Vec<String> {
        match self {
            OutputShape::Scalar => vec![base.to_string()],
            OutputShape::Vector(len) => (0..*len).map(|i| format!("{}.{}", base, i)).collect(),
            OutputShape::Keyed(keys) => keys.iter().map(|k| format!("{}/{}", base, k)).collect(),
        }
    }

    /// Map a sample's result onto this shape.
    ///
    /// On mismatch the error carries a description of what was produced.
    pub fn extract(&self, value: ScriptValue) -> std::result::Result<Vec<f64>, String> {
        match (self, value) {
            (OutputShape::Scalar, ScriptValue::Number(y)) => Ok(vec![y]),
            (OutputShape::Vector(len), ScriptValue::Array(items)) if items.len() == *len => {
                Ok(items)
            }
            (OutputShape::Keyed(keys), ScriptValue::Object(entries))
                if entries.len() == keys.len()
                    && entries.iter().zip(keys).all(|((key, _), want)| key == want) =>
            {
                Ok(entries.into_iter().map(|(_, y)| y).collect())
            }
            (_, other) => Err(other.describe()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OutputShape::Scalar => "a number".to_string(),
            OutputShape::Vector(len) => format!("an array of length {}", len),
            OutputShape::Keyed(keys) => format!("an object with keys [{}]", keys.join(", ")),
        }
    }
}
