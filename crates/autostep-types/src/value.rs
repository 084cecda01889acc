//! Scalar parameter values.
//!
//! Registry values and expectations in workflow files may be written as
//! booleans, numbers or strings. `ParamValue` is the closed set of shapes
//! accepted; lists and maps are rejected when converting from JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;

/// A scalar step parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Render the value the way it is compared and written as a string.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Interpret the value as a boolean.
    ///
    /// Strings accept `true/false/1/0/yes/no/on/off` (trimmed, any case);
    /// numbers are true when nonzero.
    pub fn as_loose_bool(&self) -> Result<bool, String> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Integer(i) => Ok(*i != 0),
            Self::Float(f) => Ok(*f != 0.0),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(format!("expected must be boolean-like, got {s:?}")),
            },
        }
    }

    /// Unsigned 32-bit view used for DWORD registry values.
    pub fn as_u32(&self) -> Result<u32, String> {
        match self {
            Self::Integer(i) => {
                u32::try_from(*i).map_err(|_| format!("value {i} does not fit in a dword"))
            }
            Self::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX) => {
                Ok(*f as u32)
            }
            Self::String(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("value {s:?} is not a valid dword")),
            other => Err(format!("value {other} is not a valid dword")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

impl TryFrom<Value> for ParamValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(format!("unsupported number {n}"))
                }
            }
            other => Err(format!(
                "expected must be bool/number/string, got {}",
                type_name(&other)
            )),
        }
    }
}

/// Loose-boolean expectation with "absent means true".
pub fn loose_bool(value: Option<&ParamValue>) -> Result<bool, String> {
    value.map_or(Ok(true), ParamValue::as_loose_bool)
}

/// Same as [`loose_bool`] for a raw JSON value, rejecting non-scalars.
pub fn loose_bool_json(value: Option<&Value>) -> Result<bool, String> {
    match value {
        None | Some(Value::Null) => Ok(true),
        Some(v) => ParamValue::try_from(v.clone())?.as_loose_bool(),
    }
}
