//! Extraction paths (`data.items[0]`) and the path explorer listing

use crate::error::{IngotError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// One dot-separated segment: optional key followed by zero or more [n] indices
static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").unwrap()
});

static INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+)\]").unwrap()
});

/// One step of an extraction path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse a dot/bracket path. An empty path selects the whole document.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let path = path.trim();
    let mut segments = Vec::new();
    if path.is_empty() {
        return Ok(segments);
    }

    for part in path.split('.') {
        let caps = SEGMENT_REGEX
            .captures(part)
            .ok_or_else(|| IngotError::invalid_path(path))?;

        let key = &caps[1];
        let indices = &caps[2];
        if key.is_empty() && indices.is_empty() {
            return Err(IngotError::invalid_path(path));
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        }
        for idx in INDEX_REGEX.captures_iter(indices) {
            let idx = idx[1]
                .parse::<usize>()
                .map_err(|_| IngotError::invalid_path(path))?;
            segments.push(PathSegment::Index(idx));
        }
    }

    Ok(segments)
}

/// Resolve `path` against `value`. Missing keys, bad indices and a `null`
/// result are all reported as [`IngotError::InvalidPath`].
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Result<&'a Value> {
    let segments = parse_path(path)?;
    let mut current = value;

    for segment in &segments {
        let next = match segment {
            PathSegment::Key(key) => current.as_object().and_then(|map| map.get(key)),
            PathSegment::Index(idx) => current.as_array().and_then(|items| items.get(*idx)),
        };
        current = next.ok_or_else(|| IngotError::invalid_path(path.trim()))?;
    }

    if current.is_null() {
        return Err(IngotError::invalid_path(path.trim()));
    }
    Ok(current)
}

/// List paths a user could extract from `value`.
///
/// Object keys are listed at every level. Arrays are listed as `prefix[]`
/// and only their first element is explored when it is an object.
pub fn available_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(value, "", &mut paths);
    paths
}

fn collect_paths(value: &Value, prefix: &str, paths: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            paths.push(format!("{}[]", prefix));
            if let Some(first @ (Value::Object(_) | Value::Array(_))) = items.first() {
                collect_paths(first, &format!("{}[0]", prefix), paths);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                let current = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                paths.push(current.clone());

                match child {
                    Value::Array(items) => match items.first() {
                        Some(first @ (Value::Object(_) | Value::Array(_))) => {
                            collect_paths(first, &format!("{}[0]", current), paths);
                        }
                        Some(_) => paths.push(format!("{}[]", current)),
                        None => {}
                    },
                    Value::Object(_) => collect_paths(child, &current, paths),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}
