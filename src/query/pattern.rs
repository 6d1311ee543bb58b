use regex::{Regex, RegexBuilder};
use tracing::debug;

/// A per-column search pattern, compiled once per filter pass.
///
/// Text that is not a valid regular expression degrades to a
/// case-insensitive substring test instead of failing the pass.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Regex(Regex),
    Literal(String),
}

impl CompiledPattern {
    pub fn compile(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => CompiledPattern::Regex(regex),
            Err(err) => {
                debug!(pattern, error = %err, "search pattern is not a regex, matching literally");
                CompiledPattern::Literal(pattern.to_lowercase())
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Regex(regex) => regex.is_match(text),
            CompiledPattern::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }

    pub fn is_literal_fallback(&self) -> bool {
        matches!(self, CompiledPattern::Literal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_is_case_insensitive() {
        let pattern = CompiledPattern::compile("^al");
        assert!(!pattern.is_literal_fallback());
        assert!(pattern.is_match("Alice"));
        assert!(!pattern.is_match("Sally"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let pattern = CompiledPattern::compile("[abc");
        assert!(pattern.is_literal_fallback());
        assert!(pattern.is_match("xx[ABC]"));
        assert!(!pattern.is_match("abc"));
    }
}
