use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Structured value manipulated by expressions and stored in states.
///
/// Mirrors the JSON data model so state values can be persisted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value. A materialized state value is never `Null`.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Heterogeneous list.
    List(Vec<Value>),
    /// String-keyed map with deterministic key order.
    Map(BTreeMap<String, Value>),
}

/// Coarse type classification used to validate transition results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `true`/`false`
    Boolean,
    /// Integer or float.
    Number,
    /// String.
    String,
    /// List.
    List,
    /// Map.
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Classify the value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) | Value::Float(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Convert into a JSON value for persistence.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(flag) => serde_json::Value::Bool(*flag),
            Value::Integer(num) => serde_json::Value::from(*num),
            Value::Float(num) => serde_json::Number::from_f64(*num)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(text) => serde_json::Value::String(text.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Reconstruct a value from JSON.
    ///
    /// Integers outside the `i64` range are carried as floats.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Boolean(*flag),
            serde_json::Value::Number(num) => match num.as_i64() {
                Some(int) => Value::Integer(int),
                None => Value::Float(num.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(text) => Value::String(text.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Whether the value has an exact JSON form: no `NaN` or infinite float
    /// anywhere inside it.
    pub fn is_storable(&self) -> bool {
        match self {
            Value::Float(num) => num.is_finite(),
            Value::List(items) => items.iter().all(Value::is_storable),
            Value::Map(entries) => entries.values().all(Value::is_storable),
            _ => true,
        }
    }

    /// Numeric view used by arithmetic and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(num) => Some(*num as f64),
            Value::Float(num) => Some(*num),
            _ => None,
        }
    }

    /// Convenience accessor for string references.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Truthiness used by `if`, `cond`, `and`, `or` and `not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(flag) => *flag,
            Value::Integer(num) => *num != 0,
            Value::Float(num) => *num != 0.0 && !num.is_nan(),
            Value::String(text) => !text.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }
}

/// Text form used by string concatenation and descriptions.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(flag) => write!(f, "{}", flag),
            Value::Integer(num) => write!(f, "{}", num),
            Value::Float(num) => write!(f, "{}", num),
            Value::String(text) => f.write_str(text),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
