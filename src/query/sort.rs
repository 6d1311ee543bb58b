//! Tri-state column sorting

use crate::types::{Column, FlatRow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// Leading numeric prefix, the way a lenient float parser reads "12px" as 12
static FLOAT_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The active (column, direction) pair plus the last clicked column.
///
/// Each column moves through `None -> Ascending -> Descending -> None`.
/// Only one column is active at a time; clicking another column starts it at
/// `Ascending`. With no active column rows keep their flattened order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    #[serde(default)]
    active: Option<(Column, SortDirection)>,
    #[serde(default)]
    last_clicked: Option<Column>,
}

impl SortState {
    pub fn none() -> Self {
        SortState::default()
    }

    pub fn ascending(column: impl Into<Column>) -> Self {
        let column = column.into();
        SortState {
            active: Some((column.clone(), SortDirection::Ascending)),
            last_clicked: Some(column),
        }
    }

    pub fn descending(column: impl Into<Column>) -> Self {
        let column = column.into();
        SortState {
            active: Some((column.clone(), SortDirection::Descending)),
            last_clicked: Some(column),
        }
    }

    pub fn active(&self) -> Option<(&str, SortDirection)> {
        self.active.as_ref().map(|(column, dir)| (column.as_str(), *dir))
    }

    pub fn last_clicked(&self) -> Option<&str> {
        self.last_clicked.as_deref()
    }

    /// Direction shown for `column` (None when it is not the active column)
    pub fn direction_of(&self, column: &str) -> Option<SortDirection> {
        match &self.active {
            Some((active, dir)) if active == column => Some(*dir),
            _ => None,
        }
    }

    pub fn is_natural(&self) -> bool {
        self.active.is_none()
    }

    /// Next state after a click on `column`
    pub fn toggle(&self, column: &str) -> SortState {
        let active = match self.direction_of(column) {
            None => Some((column.to_string(), SortDirection::Ascending)),
            Some(SortDirection::Ascending) => Some((column.to_string(), SortDirection::Descending)),
            Some(SortDirection::Descending) => None,
        };
        SortState {
            active,
            last_clicked: Some(column.to_string()),
        }
    }
}

struct SortKey {
    text: String,
    number: Option<f64>,
}

impl SortKey {
    fn new(text: String) -> Self {
        let number = parse_float_prefix(&text);
        SortKey { text, number }
    }

    // Empty cells, then numeric cells by value, then text by locale_cmp.
    // Pairs within one class follow the cell comparator; the class split keeps
    // the order total when numeric and textual cells are mixed.
    fn class(&self) -> u8 {
        if self.text.is_empty() {
            0
        } else if self.number.is_some() {
            1
        } else {
            2
        }
    }

    fn cmp(&self, other: &SortKey) -> Ordering {
        self.class().cmp(&other.class()).then_with(|| match (self.number, other.number) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => locale_cmp(&self.text, &other.text),
        })
    }
}

/// Text ordering for sorted columns.
///
/// Letters first compare without accents or case (`élan` sits between
/// `apple` and `fox`). Ties then put unaccented before accented, and finally
/// lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(|c| base_letter(c).to_lowercase())
        .cmp(b.chars().flat_map(|c| base_letter(c).to_lowercase()))
        .then_with(|| {
            a.chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase))
        })
        .then_with(|| b.cmp(a))
}

/// Base letter of a Latin-1 or Latin Extended-A accented letter
fn base_letter(c: char) -> char {
    match c {
        'À'..='Å' | 'Ā' | 'Ă' | 'Ą' | 'Æ' => 'A',
        'à'..='å' | 'ā' | 'ă' | 'ą' | 'æ' => 'a',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'Ď' | 'Đ' => 'D',
        'ď' | 'đ' => 'd',
        'È'..='Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ì'..='Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'Ł' | 'Ĺ' | 'Ļ' | 'Ľ' => 'L',
        'ł' | 'ĺ' | 'ļ' | 'ľ' => 'l',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ò'..='Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ŕ' | 'Ŗ' | 'Ř' => 'R',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ţ' | 'Ť' => 'T',
        'ţ' | 'ť' => 't',
        'Ù'..='Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ý' | 'Ÿ' => 'Y',
        'ý' | 'ÿ' => 'y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ź' | 'ż' | 'ž' => 'z',
        _ => c,
    }
}

/// Parse the leading number of `text`, ignoring leading whitespace
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let matched = FLOAT_PREFIX_REGEX.find(trimmed)?.as_str();
    let value = match matched.trim_start_matches(|c: char| c == '+' || c == '-') {
        "Infinity" => f64::INFINITY,
        digits => digits.parse::<f64>().ok()?,
    };
    Some(if matched.starts_with('-') { -value } else { value })
}

/// Order `indices` (positions in `rows`) by the active column.
/// Natural order returns the indices unchanged. The sort is stable.
pub fn apply(rows: &[FlatRow], indices: &[usize], state: &SortState) -> Vec<usize> {
    let Some((column, direction)) = state.active() else {
        return indices.to_vec();
    };

    let mut keyed: Vec<(usize, SortKey)> = indices
        .iter()
        .map(|&idx| (idx, SortKey::new(rows[idx].coerced(column))))
        .collect();

    keyed.sort_by(|(_, a), (_, b)| match direction {
        SortDirection::Ascending => a.cmp(b),
        SortDirection::Descending => b.cmp(a),
    });

    keyed.into_iter().map(|(idx, _)| idx).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;

    fn rows(values: &[Option<&str>]) -> Vec<FlatRow> {
        values
            .iter()
            .map(|value| {
                let mut row = FlatRow::new();
                if let Some(v) = value {
                    row.insert("c", Scalar::String(v.to_string()));
                }
                row
            })
            .collect()
    }

    #[test]
    fn test_toggle_cycle() {
        let s0 = SortState::none();
        let s1 = s0.toggle("id");
        assert_eq!(s1.active(), Some(("id", SortDirection::Ascending)));
        let s2 = s1.toggle("id");
        assert_eq!(s2.active(), Some(("id", SortDirection::Descending)));
        let s3 = s2.toggle("id");
        assert!(s3.is_natural());
        assert_eq!(s3.last_clicked(), Some("id"));
        let s4 = s3.toggle("id");
        assert_eq!(s4.active(), Some(("id", SortDirection::Ascending)));
    }

    #[test]
    fn test_toggle_other_column_restarts() {
        let state = SortState::descending("id").toggle("name");
        assert_eq!(state.active(), Some(("name", SortDirection::Ascending)));
        assert_eq!(state.direction_of("id"), None);
    }

    #[test]
    fn test_numeric_sort() {
        let rows = rows(&[Some("10"), Some("9"), Some("100"), Some("-1.5")]);
        let order = apply(&rows, &[0, 1, 2, 3], &SortState::ascending("c"));
        assert_eq!(order, vec![3, 1, 0, 2]);

        let order = apply(&rows, &[0, 1, 2, 3], &SortState::descending("c"));
        assert_eq!(order, vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_text_sort_is_case_insensitive() {
        let rows = rows(&[Some("banana"), Some("Apple"), Some("cherry"), Some("apple")]);
        let order = apply(&rows, &[0, 1, 2, 3], &SortState::ascending("c"));
        assert_eq!(order, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_missing_sorts_first_ascending() {
        let rows = rows(&[Some("b"), None, Some("2"), Some("a")]);
        let order = apply(&rows, &[0, 1, 2, 3], &SortState::ascending("c"));
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_natural_order_is_identity() {
        let rows = rows(&[Some("b"), Some("a")]);
        assert_eq!(apply(&rows, &[1, 0], &SortState::none()), vec![1, 0]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let rows = rows(&[Some("x"), Some("y"), Some("x"), Some("x")]);
        let order = apply(&rows, &[0, 1, 2, 3], &SortState::ascending("c"));
        assert_eq!(order, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("12px"), Some(12.0));
        assert_eq!(parse_float_prefix("  -3.5e2"), Some(-350.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("-"), None);
    }

    #[test]
    fn test_accents_sort_with_their_base_letter() {
        let rows = rows(&[Some("fox"), Some("élan"), Some("apple"), Some("Elan"), Some("elan")]);
        let order = apply(&rows, &[0, 1, 2, 3, 4], &SortState::ascending("c"));
        assert_eq!(order, vec![2, 4, 3, 1, 0]);

        assert_eq!(locale_cmp("Ångström", "zebra"), Ordering::Less);
        assert_eq!(locale_cmp("Łódź", "lodz"), Ordering::Greater);
        assert_eq!(locale_cmp("b", "A"), Ordering::Greater);
    }

    #[test]
    fn test_mixed_numbers_and_text() {
        let rows = rows(&[Some("abc"), Some("10"), Some("9"), None]);
        let order = apply(&rows, &[0, 1, 2, 3], &SortState::ascending("c"));
        assert_eq!(order, vec![3, 2, 1, 0]);
    }
}
