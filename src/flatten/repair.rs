//! Pretty-printing with best-effort repair of almost-JSON input

use crate::error::{IngotError, Result};
use crate::flatten::parse::parse_json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TRAILING_COMMA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",(\s*[}\]])").unwrap()
});

static BARE_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([{,]\s*)(\w+)(\s*:)"#).unwrap()
});

static ARRAY_SPAN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[.*\]").unwrap()
});

static OBJECT_SPAN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{.*\}").unwrap()
});

/// Which strategy produced a parseable document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Input was already valid JSON
    None,
    /// Trailing commas, bare keys or missing outer braces were fixed
    Patched,
    /// The outermost `[...]` span was extracted
    ArrayExtracted,
    /// The outermost `{...}` span was extracted
    ObjectExtracted,
}

#[derive(Debug, Clone)]
pub struct Beautified {
    pub text: String,
    pub value: Value,
    pub repair: Repair,
}

/// Pretty-print `text` with two-space indentation, repairing common
/// hand-edited mistakes when it does not parse as-is.
pub fn beautify(text: &str) -> Result<Beautified> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(IngotError::Parse("empty input".to_string()));
    }

    let original_err = match parse_json(trimmed) {
        Ok(value) => return finish(value, Repair::None),
        Err(err) => err,
    };

    if let Ok(value) = parse_json(&patch(trimmed)) {
        return finish(value, Repair::Patched);
    }

    if let Some(span) = ARRAY_SPAN_REGEX.find(trimmed) {
        if let Ok(value) = parse_json(span.as_str()) {
            return finish(value, Repair::ArrayExtracted);
        }
    }

    if let Some(span) = OBJECT_SPAN_REGEX.find(trimmed) {
        if let Ok(value) = parse_json(span.as_str()) {
            return finish(value, Repair::ObjectExtracted);
        }
    }

    Err(original_err)
}

fn finish(value: Value, repair: Repair) -> Result<Beautified> {
    let text = serde_json::to_string_pretty(&value)?;
    Ok(Beautified { text, value, repair })
}

/// Apply the textual fixes: drop trailing commas, quote bare keys, and wrap
/// unbracketed content.
fn patch(text: &str) -> String {
    let fixed = TRAILING_COMMA_REGEX.replace_all(text, "$1");
    let mut fixed = BARE_KEY_REGEX.replace_all(&fixed, "$1\"$2\"$3").into_owned();

    let bracketed = |s: &str| s.starts_with('{') || s.starts_with('[');
    if !bracketed(&fixed) && fixed.contains(':') {
        fixed = format!("{{{}}}", fixed);
    }
    if !bracketed(&fixed) && fixed.contains(',') {
        fixed = format!("[{}]", fixed);
    }
    fixed
}
