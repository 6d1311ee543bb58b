//! Unique-value cache backing the per-column filter choice lists

use crate::query::filter::{self, FilterState};
use crate::types::{Column, EngineConfig, FlatRow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Sorted distinct values of one column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub values: Vec<String>,
    /// More distinct values existed than the cache keeps
    pub truncated: bool,
}

impl Facet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Limits applied when collecting facet values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetLimits {
    pub max_values: usize,
    pub max_value_len: usize,
}

impl FacetLimits {
    pub fn from_config(config: &EngineConfig) -> Self {
        FacetLimits {
            max_values: config.max_unique_values.max(1),
            max_value_len: config.max_facet_value_len,
        }
    }
}

impl Default for FacetLimits {
    fn default() -> Self {
        FacetLimits::from_config(&EngineConfig::default())
    }
}

/// Collect the distinct values of `column` over the given rows.
///
/// Missing and null cells are skipped, as are values longer than
/// `max_value_len` characters. Values sort numerically when every one of them
/// parses as a number, otherwise byte-wise. The sorted list is cut to
/// `max_values` and `truncated` records whether anything was dropped.
pub fn collect<'a, I>(rows: I, column: &str, limits: FacetLimits) -> Facet
where
    I: IntoIterator<Item = &'a FlatRow>,
{
    let distinct: BTreeSet<String> = rows
        .into_iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .map(|value| value.coerce())
        .filter(|text| text.chars().count() <= limits.max_value_len)
        .collect();

    let mut values: Vec<String> = distinct.into_iter().collect();
    let numeric: Option<Vec<f64>> = values.iter().map(|v| parse_number(v)).collect();
    if let Some(numbers) = numeric {
        let mut paired: Vec<(f64, String)> = numbers.into_iter().zip(values).collect();
        paired.sort_by(|(a, ta), (b, tb)| a.total_cmp(b).then_with(|| ta.cmp(tb)));
        values = paired.into_iter().map(|(_, text)| text).collect();
    }

    let truncated = values.len() > limits.max_values;
    values.truncate(limits.max_values);
    Facet { values, truncated }
}

/// Distinct values of `excluded` over the rows passing every other criterion
pub fn collect_excluding(
    rows: &[FlatRow],
    state: &FilterState,
    excluded: &str,
    limits: FacetLimits,
) -> Facet {
    let passing = filter::apply_excluding(rows, state, excluded);
    collect(passing.iter().map(|&idx| &rows[idx]), excluded, limits)
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Column -> [`Facet`] map computed once per load.
///
/// Lookups are read-through: a column missing from the cache is computed and
/// inserted on first request. The cache is only ever replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct UniqueValueCache {
    entries: HashMap<Column, Arc<Facet>>,
    limits: FacetLimits,
}

impl UniqueValueCache {
    pub fn new(limits: FacetLimits) -> Self {
        UniqueValueCache {
            entries: HashMap::new(),
            limits,
        }
    }

    /// Precompute every column
    pub fn build(
        rows: &[FlatRow],
        columns: &[Column],
        limits: FacetLimits,
        parallel: bool,
    ) -> Self {
        let compute = |column: &Column| (column.clone(), Arc::new(collect(rows, column, limits)));
        let entries = if parallel {
            columns.par_iter().map(compute).collect()
        } else {
            columns.iter().map(compute).collect()
        };
        UniqueValueCache { entries, limits }
    }

    pub fn limits(&self) -> FacetLimits {
        self.limits
    }

    pub fn get(&self, column: &str) -> Option<Arc<Facet>> {
        self.entries.get(column).cloned()
    }

    pub fn get_or_compute(&mut self, rows: &[FlatRow], column: &str) -> Arc<Facet> {
        if let Some(facet) = self.entries.get(column) {
            return facet.clone();
        }
        let facet = Arc::new(collect(rows, column, self.limits));
        self.entries.insert(column.to_string(), facet.clone());
        facet
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Flattener;
    use serde_json::json;

    fn rows() -> Vec<FlatRow> {
        Flattener::default()
            .flatten(&json!([
                {"id": 10, "city": "Oslo", "note": null},
                {"id": 9, "city": "Bergen"},
                {"id": 100, "city": "Oslo"},
                {"id": 9, "city": "bodø"}
            ]))
            .unwrap()
            .rows
    }

    #[test]
    fn test_numeric_values_sort_numerically() {
        let facet = collect(&rows(), "id", FacetLimits::default());
        assert_eq!(facet.values, vec!["9", "10", "100"]);
        assert!(!facet.truncated);
    }

    #[test]
    fn test_text_values_sort_bytewise() {
        let facet = collect(&rows(), "city", FacetLimits::default());
        assert_eq!(facet.values, vec!["Bergen", "Oslo", "bodø"]);
    }

    #[test]
    fn test_null_and_missing_are_skipped() {
        assert!(collect(&rows(), "note", FacetLimits::default()).is_empty());
        assert!(collect(&rows(), "nope", FacetLimits::default()).is_empty());
    }

    #[test]
    fn test_cap_and_long_values() {
        let limits = FacetLimits {
            max_values: 2,
            max_value_len: 5,
        };
        let facet = collect(&rows(), "city", limits);
        assert_eq!(facet.values, vec!["Oslo", "bodø"]);
        assert!(!facet.truncated);

        let facet = collect(&rows(), "id", limits);
        assert_eq!(facet.values, vec!["9", "10"]);
        assert!(facet.truncated);
    }

    #[test]
    fn test_collect_excluding() {
        let rows = rows();
        let state = FilterState::new()
            .with_selected_values("city", ["Oslo"])
            .with_selected_values("id", ["9"]);

        let cities = collect_excluding(&rows, &state, "city", FacetLimits::default());
        assert_eq!(cities.values, vec!["Bergen", "bodø"]);

        let ids = collect_excluding(&rows, &state, "id", FacetLimits::default());
        assert_eq!(ids.values, vec!["10", "100"]);
    }

    #[test]
    fn test_cache_read_through() {
        let rows = rows();
        let mut cache = UniqueValueCache::new(FacetLimits::default());
        assert!(cache.get("id").is_none());

        let facet = cache.get_or_compute(&rows, "id");
        assert_eq!(facet.len(), 3);
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_build_covers_every_column() {
        let rows = rows();
        let columns: Vec<Column> = vec!["city".into(), "id".into(), "note".into()];
        let cache = UniqueValueCache::build(&rows, &columns, FacetLimits::default(), true);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("city").unwrap().len(), 3);
    }
}
