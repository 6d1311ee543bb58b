use crate::flatten::flattener::looks_like_container;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Summary counts shown alongside a loaded dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStats {
    pub rows: usize,
    pub columns: usize,
    /// Nested objects, arrays and decodable JSON strings below the row level
    pub nested_fields: usize,
}

impl DataStats {
    pub fn new(source: &Value, rows: usize, columns: usize) -> Self {
        let nested_fields = match source {
            Value::Array(items) => count_nested(items.iter().map(Cow::Borrowed).collect()),
            other => count_nested(vec![Cow::Borrowed(other)]),
        };
        DataStats {
            rows,
            columns,
            nested_fields,
        }
    }
}

/// Count containers below the `roots`. Arrays count once and only descend
/// into their object elements.
fn count_nested(roots: Vec<Cow<'_, Value>>) -> usize {
    let mut count = 0;
    // Explicit frames: each entry is a container whose children are still unvisited
    let mut stack = roots;

    while let Some(node) = stack.pop() {
        for child in children(node) {
            if child.is_object() {
                count += 1;
                stack.push(child);
            } else if child.is_array() {
                count += 1;
                stack.extend(children(child).into_iter().filter(|item| item.is_object()));
            } else if let Some(decoded) = child.as_str().and_then(decode_container) {
                count += 1;
                stack.push(Cow::Owned(decoded));
            }
        }
    }
    count
}

fn children(node: Cow<'_, Value>) -> Vec<Cow<'_, Value>> {
    match node {
        Cow::Borrowed(Value::Object(map)) => map.values().map(Cow::Borrowed).collect(),
        Cow::Borrowed(Value::Array(items)) => items.iter().map(Cow::Borrowed).collect(),
        Cow::Owned(Value::Object(map)) => {
            map.into_iter().map(|(_, child)| Cow::Owned(child)).collect()
        }
        Cow::Owned(Value::Array(items)) => items.into_iter().map(Cow::Owned).collect(),
        _ => Vec::new(),
    }
}

fn decode_container(text: &str) -> Option<Value> {
    if !looks_like_container(text) {
        return None;
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|decoded| decoded.is_object() || decoded.is_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_rows_have_no_nesting() {
        let stats = DataStats::new(&json!([{"a": 1}, {"a": 2}]), 2, 1);
        assert_eq!(stats.nested_fields, 0);
    }

    #[test]
    fn test_nested_counts() {
        let doc = json!({
            "user": {"address": {"city": "Oslo"}},
            "tags": [{"k": {"v": 1}}, "x"],
            "meta": "{\"a\": {\"b\": 1}}",
            "plain": "{oops"
        });
        // user, user.address, tags, tags[0].k, meta, meta.a
        assert_eq!(DataStats::new(&doc, 1, 4).nested_fields, 6);
    }

    #[test]
    fn test_top_level_strings_are_not_counted() {
        let doc = json!(["{\"a\": 1}", {"b": "[1, 2]"}]);
        // only the decoded string inside the object
        assert_eq!(DataStats::new(&doc, 2, 2).nested_fields, 1);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut value = json!(1);
        for _ in 0..50_000 {
            value = serde_json::Value::Object(serde_json::Map::from_iter([("n".to_string(), value)]));
        }
        assert_eq!(DataStats::new(&value, 1, 1).nested_fields, 49_999);
        // serde_json's recursive Drop is not what this test exercises
        std::mem::forget(value);
    }
}
