use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A fully-qualified flattened path such as `user.tags[1]`
pub type Column = String;

/// A leaf value stored in a [`FlatRow`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Convert a JSON leaf into a scalar. Containers return `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Owned variant of [`Scalar::from_value`]
    pub fn from_owned(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(b)),
            Value::Number(n) => Some(Scalar::Number(n)),
            Value::String(s) => Some(Scalar::String(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Canonical string form used for filtering, faceting and sorting.
    /// Null coerces to the empty string.
    pub fn coerce(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => render_number(n),
            Scalar::String(s) => s.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => f.write_str(&render_number(n)),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// Integral floats print without a fraction, so `1.0` reads as `1`
fn render_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{}", f)
            }
        }
        _ => n.to_string(),
    }
}

/// One top-level JSON element reduced to a column -> scalar mapping.
///
/// An absent key means the row has no value at that column, which is distinct
/// from an explicit [`Scalar::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRow {
    cells: BTreeMap<Column, Scalar>,
}

impl FlatRow {
    pub fn new() -> Self {
        FlatRow::default()
    }

    /// Store a scalar, returning the value it replaced
    pub fn insert(&mut self, column: impl Into<Column>, value: Scalar) -> Option<Scalar> {
        self.cells.insert(column.into(), value)
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.cells.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Coerced cell value: missing and null both become the empty string
    pub fn coerced(&self, column: &str) -> String {
        self.cells.get(column).map(Scalar::coerce).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Scalar)> {
        self.cells.iter()
    }

    /// JSON object view of the row, keys in column order
    pub fn to_json(&self) -> Map<String, Value> {
        self.cells
            .iter()
            .map(|(column, value)| (column.clone(), value.to_value()))
            .collect()
    }
}

/// Configuration for loading and querying a dataset
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of top-level elements flattened per batch
    pub batch_size: usize,

    /// Flatten batches on the rayon pool
    pub parallel: bool,

    /// Decode object/array-shaped strings and merge them under their own key
    pub decode_embedded_json: bool,

    /// Column used when a top-level array element is a bare scalar
    pub scalar_column: String,

    /// Maximum number of distinct values kept per column in the facet cache
    pub max_unique_values: usize,

    /// Values longer than this many characters are not offered as facets
    pub max_facet_value_len: usize,

    /// Page size used by new sessions
    pub default_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            batch_size: 100,
            parallel: true,
            decode_embedded_json: true,
            scalar_column: String::from("value"),
            max_unique_values: 500,
            max_facet_value_len: 100,
            default_page_size: 25,
        }
    }
}

/// Short name of a JSON value's kind, used in error messages
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
