use crate::error::{IngotError, Result};
use serde_json::Value;

/// Parse JSON text, SIMD first.
///
/// simd-json needs a mutable copy of the input. When it rejects the text we
/// re-parse with serde_json so the error carries a line and column.
pub fn parse_json(text: &str) -> Result<Value> {
    let mut bytes = text.as_bytes().to_vec();
    match simd_json::serde::from_slice::<Value>(&mut bytes) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(text).map_err(|err| IngotError::Parse(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid() {
        let value = parse_json(r#"[{"id": 1, "name": "Alice"}]"#).unwrap();
        assert_eq!(value, json!([{"id": 1, "name": "Alice"}]));
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = parse_json("{\"a\": 1,\n \"b\": }").unwrap_err();
        match err {
            IngotError::Parse(message) => assert!(message.contains("line 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
