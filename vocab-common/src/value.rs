//! Cell value normalization
//!
//! A cell read from a record store arrives as a bare string, a native list,
//! a string holding a JSON array, or some other scalar (number, bool). The
//! normalizer turns any of those into an ordered list of scalar strings plus
//! a [`ValueShape`] recording how to rebuild a value of the same kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Row identifier within a table (SQLite rowid, CSV row index)
pub type RowKey = i64;

/// Original cell content as read from a record store
///
/// Serializes to plain JSON: `null`, a string, an array, or any other JSON
/// scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Missing value
    Null,
    /// Text cell (may hold a JSON-encoded array)
    Text(String),
    /// Native list of scalars
    List(Vec<Value>),
    /// Any other scalar type (number, bool)
    Other(Value),
}

impl RawValue {
    /// True when the record store's null convention applies
    /// (null, or text that is empty after trimming)
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Other(Value::Null) => true,
            RawValue::Other(Value::String(s)) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form used when writing the value back to a text column
    pub fn to_cell_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::List(items) => Some(Value::Array(items.clone()).to_string()),
            RawValue::Other(Value::Null) => None,
            RawValue::Other(v) => Some(scalar_string(v)),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::List(items),
            other => RawValue::Other(other),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// How a normalized value was encoded in its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// Single scalar string
    Scalar,
    /// String holding a JSON array
    JsonArray,
    /// Native list
    NativeArray,
}

/// Canonical view of a [`RawValue`]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedValue {
    /// Elements coerced to strings, in cell order (never empty)
    pub scalars: Vec<String>,
    /// Original elements, kept verbatim for reconstruction
    pub elements: Vec<Value>,
    /// Encoding of the source cell
    pub shape: ValueShape,
}

impl NormalizedValue {
    fn scalar(text: String) -> Self {
        Self {
            elements: vec![Value::String(text.clone())],
            scalars: vec![text],
            shape: ValueShape::Scalar,
        }
    }

    fn array(items: Vec<Value>, shape: ValueShape) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            scalars: items.iter().map(scalar_string).collect(),
            elements: items,
            shape,
        })
    }

    /// First scalar (the one evaluated in first-element mode)
    pub fn first(&self) -> &str {
        &self.scalars[0]
    }

    /// True for JSON and native arrays
    pub fn is_array(&self) -> bool {
        self.shape != ValueShape::Scalar
    }

    /// Rebuild a raw value in the original encoding
    pub fn to_raw(&self) -> Result<RawValue> {
        self.rebuild(self.elements.clone())
    }

    /// Rebuild a raw value in the original encoding with some elements replaced
    ///
    /// Positions not listed keep their original element verbatim. For the
    /// scalar shape only position 0 is meaningful.
    pub fn with_replacements(&self, replacements: &[(usize, String)]) -> Result<RawValue> {
        let mut elements = self.elements.clone();
        for (index, label) in replacements {
            if let Some(slot) = elements.get_mut(*index) {
                *slot = Value::String(label.clone());
            }
        }
        self.rebuild(elements)
    }

    fn rebuild(&self, elements: Vec<Value>) -> Result<RawValue> {
        Ok(match self.shape {
            ValueShape::Scalar => RawValue::Text(
                elements
                    .first()
                    .map(scalar_string)
                    .unwrap_or_default(),
            ),
            ValueShape::JsonArray => RawValue::Text(serde_json::to_string(&elements)?),
            ValueShape::NativeArray => RawValue::List(elements),
        })
    }
}

/// Coerce a JSON element to the string used for matching
///
/// Strings are taken as-is; every other value uses its JSON text.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize a raw cell value
///
/// Returns `None` when the cell holds no evaluable value (null, blank text,
/// or an empty array); callers skip such cells.
pub fn normalize(raw: &RawValue) -> Option<NormalizedValue> {
    match raw {
        RawValue::Null => None,
        RawValue::List(items) => NormalizedValue::array(items.clone(), ValueShape::NativeArray),
        RawValue::Text(text) => normalize_text(text),
        RawValue::Other(Value::Null) => None,
        RawValue::Other(Value::String(text)) => normalize_text(text),
        RawValue::Other(other) => Some(NormalizedValue::scalar(scalar_string(other))),
    }
}

fn normalize_text(text: &str) -> Option<NormalizedValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => NormalizedValue::array(items, ValueShape::JsonArray),
            Ok(_) | Err(_) => {
                tracing::debug!(value = %trimmed, "Array-like text is not a JSON array, treating as scalar");
                Some(NormalizedValue::scalar(trimmed.to_string()))
            }
        };
    }

    Some(NormalizedValue::scalar(text.to_string()))
}
