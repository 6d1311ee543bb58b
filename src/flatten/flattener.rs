use crate::error::{IngotError, Result};
use crate::types::{kind_of, Column, EngineConfig, FlatRow, Scalar};
use rayon::prelude::*;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::debug;

/// Rows and the column accumulator produced by one flattening pass
#[derive(Debug, Clone, Default)]
pub struct FlattenOutput {
    pub rows: Vec<FlatRow>,
    pub columns: BTreeSet<Column>,
    /// Scalars that overwrote an earlier scalar at the same column in the same row
    pub collisions: usize,
}

/// Turns JSON documents into flat rows keyed by dot/bracket paths
#[derive(Debug, Clone)]
pub struct Flattener {
    batch_size: usize,
    parallel: bool,
    decode_embedded_json: bool,
    scalar_column: String,
}

impl Flattener {
    pub fn new(config: &EngineConfig) -> Self {
        Flattener {
            batch_size: config.batch_size.max(1),
            parallel: config.parallel,
            decode_embedded_json: config.decode_embedded_json,
            scalar_column: config.scalar_column.clone(),
        }
    }

    /// Flatten a top-level object (one row) or array (one row per element)
    pub fn flatten(&self, value: &Value) -> Result<FlattenOutput> {
        match value {
            Value::Array(elements) => Ok(self.flatten_elements(elements)),
            Value::Object(_) => {
                let mut columns = BTreeSet::new();
                let (row, collisions) = self.flatten_row(value, &mut columns);
                Ok(FlattenOutput {
                    rows: vec![row],
                    columns,
                    collisions,
                })
            }
            other => Err(IngotError::InvalidShape {
                found: kind_of(other),
            }),
        }
    }

    /// Process elements in fixed-size batches. Each batch owns its own
    /// accumulator; batches are merged in element order so the output does
    /// not depend on batch size or completion order.
    fn flatten_elements(&self, elements: &[Value]) -> FlattenOutput {
        let flatten_batch = |batch: &[Value]| {
            let mut columns = BTreeSet::new();
            let mut collisions = 0;
            let rows: Vec<FlatRow> = batch
                .iter()
                .map(|element| {
                    let (row, hits) = self.flatten_row(element, &mut columns);
                    collisions += hits;
                    row
                })
                .collect();
            (rows, columns, collisions)
        };

        let batches: Vec<(Vec<FlatRow>, BTreeSet<Column>, usize)> = if self.parallel {
            elements.par_chunks(self.batch_size).map(flatten_batch).collect()
        } else {
            elements.chunks(self.batch_size).map(flatten_batch).collect()
        };

        debug!(
            elements = elements.len(),
            batches = batches.len(),
            batch_size = self.batch_size,
            "flattened array elements"
        );

        let mut output = FlattenOutput {
            rows: Vec::with_capacity(elements.len()),
            ..FlattenOutput::default()
        };
        for (rows, columns, collisions) in batches {
            output.rows.extend(rows);
            output.columns.extend(columns);
            output.collisions += collisions;
        }
        output
    }

    /// Flatten one element into a row. Returns the row and the number of
    /// overwritten cells.
    pub fn flatten_row(&self, element: &Value, columns: &mut BTreeSet<Column>) -> (FlatRow, usize) {
        let mut row = FlatRow::new();
        let mut collisions = 0;

        // A bare scalar at the top of an element has no path of its own
        let root: Cow<'_, Value> = match element {
            Value::Object(_) | Value::Array(_) => Cow::Borrowed(element),
            Value::String(s) => match self.decode_embedded(s) {
                Some(decoded) => Cow::Owned(decoded),
                None => {
                    let column = self.scalar_column.clone();
                    let scalar = Scalar::String(s.clone());
                    self.store(&mut row, columns, column, scalar, &mut collisions);
                    return (row, collisions);
                }
            },
            leaf => {
                if let Some(scalar) = Scalar::from_value(leaf) {
                    let column = self.scalar_column.clone();
                    self.store(&mut row, columns, column, scalar, &mut collisions);
                }
                return (row, collisions);
            }
        };

        // Explicit (value, prefix) frames keep stack usage flat for deep documents.
        // Children are pushed in reverse so they pop in source order.
        let mut stack: Vec<(Cow<'_, Value>, String)> = vec![(root, String::new())];

        while let Some((node, prefix)) = stack.pop() {
            match node {
                Cow::Borrowed(value) => match value {
                    Value::Object(map) => {
                        for (key, child) in map.iter().rev() {
                            stack.push((Cow::Borrowed(child), join_key(&prefix, key)));
                        }
                    }
                    Value::Array(items) => {
                        for (idx, child) in items.iter().enumerate().rev() {
                            stack.push((Cow::Borrowed(child), join_index(&prefix, idx)));
                        }
                    }
                    Value::String(s) => match self.decode_embedded(s) {
                        Some(decoded) => stack.push((Cow::Owned(decoded), prefix)),
                        None => {
                            let scalar = Scalar::String(s.clone());
                            self.store(&mut row, columns, prefix, scalar, &mut collisions)
                        }
                    },
                    leaf => {
                        if let Some(scalar) = Scalar::from_value(leaf) {
                            self.store(&mut row, columns, prefix, scalar, &mut collisions);
                        }
                    }
                },
                Cow::Owned(value) => match value {
                    Value::Object(map) => {
                        for (key, child) in map.into_iter().rev() {
                            let path = join_key(&prefix, &key);
                            stack.push((Cow::Owned(child), path));
                        }
                    }
                    Value::Array(items) => {
                        for (idx, child) in items.into_iter().enumerate().rev() {
                            stack.push((Cow::Owned(child), join_index(&prefix, idx)));
                        }
                    }
                    Value::String(s) => match self.decode_embedded(&s) {
                        Some(decoded) => stack.push((Cow::Owned(decoded), prefix)),
                        None => {
                            let scalar = Scalar::String(s);
                            self.store(&mut row, columns, prefix, scalar, &mut collisions)
                        }
                    },
                    leaf => {
                        if let Some(scalar) = Scalar::from_owned(leaf) {
                            self.store(&mut row, columns, prefix, scalar, &mut collisions);
                        }
                    }
                },
            }
        }

        (row, collisions)
    }

    fn store(
        &self,
        row: &mut FlatRow,
        columns: &mut BTreeSet<Column>,
        column: Column,
        value: Scalar,
        collisions: &mut usize,
    ) {
        if !columns.contains(&column) {
            columns.insert(column.clone());
        }
        // Last write in traversal order wins
        if let Some(previous) = row.insert(column.clone(), value) {
            *collisions += 1;
            debug!(
                column = %column,
                previous = %previous,
                "embedded JSON overwrote an existing cell"
            );
        }
    }

    /// Decode a string that looks like a JSON object or array.
    /// Scalars that happen to be valid JSON (`"5"`, `"true"`) are left alone.
    fn decode_embedded(&self, text: &str) -> Option<Value> {
        if !self.decode_embedded_json || !looks_like_container(text) {
            return None;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
            _ => None,
        }
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new(&EngineConfig::default())
    }
}

/// True when the trimmed text starts with `{` or `[`
pub(crate) fn looks_like_container(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn join_index(prefix: &str, idx: usize) -> String {
    format!("{}[{}]", prefix, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sequential() -> Flattener {
        Flattener::new(&EngineConfig {
            parallel: false,
            ..EngineConfig::default()
        })
    }

    fn columns_of(output: &FlattenOutput) -> Vec<&str> {
        output.columns.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_flat_object() {
        let output = sequential().flatten(&json!({"a": 1, "b": "x"})).unwrap();

        assert_eq!(output.rows.len(), 1);
        assert_eq!(columns_of(&output), vec!["a", "b"]);
        assert_eq!(output.rows[0].coerced("a"), "1");
        assert_eq!(output.rows[0].coerced("b"), "x");
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let input = json!([
            {"id": 1, "user": {"name": "Alice", "tags": ["x", "y"]}},
            {"id": 2, "user": {"name": "Bob", "tags": ["z"]}}
        ]);
        let output = sequential().flatten(&input).unwrap();

        assert_eq!(
            columns_of(&output),
            vec!["id", "user.name", "user.tags[0]", "user.tags[1]"]
        );
        assert_eq!(output.rows[0].coerced("user.tags[1]"), "y");
        assert_eq!(output.rows[1].coerced("user.name"), "Bob");
        assert!(!output.rows[1].contains("user.tags[1]"));
    }

    #[test]
    fn test_embedded_json_string_merges_under_prefix() {
        let input = json!({"meta": "{\"source\": \"api\", \"tags\": [1, 2]}"});
        let output = sequential().flatten(&input).unwrap();

        assert_eq!(columns_of(&output), vec!["meta.source", "meta.tags[0]", "meta.tags[1]"]);
        assert_eq!(output.rows[0].coerced("meta.source"), "api");
    }

    #[test]
    fn test_scalar_json_string_is_not_nested() {
        let input = json!({"n": "5", "broken": "{not json", "flag": "true"});
        let output = sequential().flatten(&input).unwrap();
        let row = &output.rows[0];

        assert_eq!(row.get("n"), Some(&Scalar::String("5".into())));
        assert_eq!(row.get("broken"), Some(&Scalar::String("{not json".into())));
        assert_eq!(row.get("flag"), Some(&Scalar::String("true".into())));
    }

    #[test]
    fn test_decoding_can_be_disabled() {
        let flattener = Flattener::new(&EngineConfig {
            decode_embedded_json: false,
            parallel: false,
            ..EngineConfig::default()
        });
        let output = flattener.flatten(&json!({"meta": "{\"a\": 1}"})).unwrap();
        assert_eq!(columns_of(&output), vec!["meta"]);
    }

    #[test]
    fn test_empty_containers_contribute_nothing() {
        let output = sequential().flatten(&json!({"a": {}, "b": [], "c": null})).unwrap();

        assert_eq!(columns_of(&output), vec!["c"]);
        assert_eq!(output.rows[0].get("c"), Some(&Scalar::Null));
    }

    #[test]
    fn test_invalid_top_level_shape() {
        for value in [json!(1), json!("text"), json!(null), json!(true)] {
            let err = sequential().flatten(&value).unwrap_err();
            assert!(matches!(err, IngotError::InvalidShape { .. }));
        }
    }

    #[test]
    fn test_scalar_elements_use_scalar_column() {
        let output = sequential().flatten(&json!([1, "two", {"a": 3}])).unwrap();

        assert_eq!(columns_of(&output), vec!["a", "value"]);
        assert_eq!(output.rows[0].coerced("value"), "1");
        assert_eq!(output.rows[1].coerced("value"), "two");
        assert!(!output.rows[2].contains("value"));
    }

    #[test]
    fn test_nested_array_elements() {
        let output = sequential().flatten(&json!([[1, {"b": 2}]])).unwrap();
        assert_eq!(columns_of(&output), vec!["[0]", "[1].b"]);
    }

    #[test]
    fn test_embedded_collision_last_write_wins() {
        let input = json!({"a": "{\"b\": 1}", "a.b": 2});
        let output = sequential().flatten(&input).unwrap();

        assert_eq!(output.collisions, 1);
        assert_eq!(output.rows[0].coerced("a.b"), "2");
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut value = json!(1);
        for _ in 0..5_000 {
            value = serde_json::Value::Object(serde_json::Map::from_iter([("n".to_string(), value)]));
        }
        let mut columns = BTreeSet::new();
        let (row, _) = sequential().flatten_row(&value, &mut columns);

        assert_eq!(row.len(), 1);
        assert_eq!(columns.iter().next().unwrap().matches('.').count(), 4_999);
        // serde_json's recursive Drop is not what this test exercises
        std::mem::forget(value);
    }

    #[test]
    fn test_batching_is_deterministic() {
        let elements: Vec<Value> = (0..257)
            .map(|i| json!({"id": i, "extra": {format!("k{}", i % 7): i}}))
            .collect();
        let input = Value::Array(elements);

        let reference = Flattener::new(&EngineConfig {
            batch_size: 1_000,
            parallel: false,
            ..EngineConfig::default()
        })
        .flatten(&input)
        .unwrap();

        for (batch_size, parallel) in [(1, true), (7, true), (50, false), (100, true)] {
            let output = Flattener::new(&EngineConfig {
                batch_size,
                parallel,
                ..EngineConfig::default()
            })
            .flatten(&input)
            .unwrap();

            assert_eq!(output.rows, reference.rows);
            assert_eq!(output.columns, reference.columns);
        }
    }
}
