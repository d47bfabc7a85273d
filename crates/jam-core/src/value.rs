//! Unified value representation for Jam scripts.
//!
//! The `Value` enum is the closed type universe every Jam operand, function
//! argument, and container element belongs to: null, booleans, IEEE-754
//! double numbers, UTF-8 strings, ordered arrays, and insertion-ordered
//! objects. Equality is deep and structural; `null == null` holds.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value in the Jam universe.
///
/// Objects preserve insertion order: iteration visits keys in the order they
/// were first inserted, and key removal preserves the order of survivors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (IEEE-754 double).
    Number(f64),
    /// String value.
    String(String),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// Insertion-ordered string-keyed map.
    Object(IndexMap<String, Value>),
}

/// The six concrete kinds a [`Value`] can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

/// A declared type hint for a variable. `Any` disables checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeHint {
    Any,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
}

impl Value {
    /// Checks if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The concrete kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Total truthiness rule used by conditionals and logical operators.
    ///
    /// Null is false; booleans are themselves; numbers are true when
    /// non-zero; strings, arrays, and objects are true when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get the value as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get the value as an array reference.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Attempts to get the value as an object reference.
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// True when the value is a finite number with no fractional part.
    pub fn is_integer_number(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_finite() && n.fract() == 0.0)
    }

    /// Converts the value to a `serde_json::Value`.
    ///
    /// # Errors
    ///
    /// Fails for non-finite numbers, which have no JSON representation.
    pub fn to_json(&self) -> Result<serde_json::Value, String> {
        match self {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| format!("number {n} has no JSON representation")),
            Value::String(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Array(a) => {
                let items: Result<Vec<_>, _> = a.iter().map(|v| v.to_json()).collect();
                Ok(serde_json::Value::Array(items?))
            }
            Value::Object(o) => {
                let mut map = serde_json::Map::new();
                for (k, v) in o {
                    map.insert(k.clone(), v.to_json()?);
                }
                Ok(serde_json::Value::Object(map))
            }
        }
    }

    /// Builds a value from a `serde_json::Value`, preserving object key
    /// order.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(a) => {
                Value::Array(a.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(o) => Value::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Parses a JSON string into the value universe.
    pub fn parse_json(text: &str) -> Result<Value, String> {
        let json: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Ok(Value::from_json(&json))
    }
}

impl ValueKind {
    /// Whether a value of this kind satisfies the given hint.
    pub fn matches_hint(self, hint: TypeHint) -> bool {
        match hint {
            TypeHint::Any => true,
            TypeHint::Boolean => self == ValueKind::Boolean,
            TypeHint::Number => self == ValueKind::Number,
            TypeHint::String => self == ValueKind::String,
            TypeHint::Array => self == ValueKind::Array,
            TypeHint::Object => self == ValueKind::Object,
            TypeHint::Null => self == ValueKind::Null,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "Null",
            ValueKind::Boolean => "Boolean",
            ValueKind::Number => "Number",
            ValueKind::String => "String",
            ValueKind::Array => "Array",
            ValueKind::Object => "Object",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeHint::Any => "Any",
            TypeHint::Boolean => "Boolean",
            TypeHint::Number => "Number",
            TypeHint::String => "String",
            TypeHint::Array => "Array",
            TypeHint::Object => "Object",
            TypeHint::Null => "Null",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => {
                write!(f, "{{")?;
                for (i, (k, v)) in obj.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{k}\": {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Object(value)
    }
}

impl<V: Into<Value>> FromIterator<(String, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
