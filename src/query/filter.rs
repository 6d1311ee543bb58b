//! Filter engine: per-column patterns, per-column value sets and a global
//! cross-column search, all AND-ed together.

use crate::query::pattern::CompiledPattern;
use crate::types::{Column, FlatRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Criteria attached to one column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Regex (or literal fallback) the coerced cell must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Coerced cell must equal one of these exactly. Empty means no constraint.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub values: BTreeSet<String>,
}

impl ColumnFilter {
    pub fn is_active(&self) -> bool {
        self.active_search().is_some() || !self.values.is_empty()
    }

    fn active_search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// Every active criterion for the current dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub columns: BTreeMap<Column, ColumnFilter>,

    #[serde(default)]
    pub global_search: String,
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    pub fn with_global_search(mut self, term: impl Into<String>) -> Self {
        self.global_search = term.into();
        self
    }

    pub fn with_column_search(
        mut self,
        column: impl Into<Column>,
        pattern: impl Into<String>,
    ) -> Self {
        self.set_column_search(column, pattern);
        self
    }

    pub fn with_selected_values<I, S>(mut self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .entry(column.into())
            .or_default()
            .values
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Set or clear (empty pattern) the search on one column
    pub fn set_column_search(&mut self, column: impl Into<Column>, pattern: impl Into<String>) {
        let column = column.into();
        let pattern = pattern.into();
        let entry = self.columns.entry(column.clone()).or_default();
        entry.search = if pattern.is_empty() { None } else { Some(pattern) };
        self.prune(&column);
    }

    /// Add the value if absent, remove it if present
    pub fn toggle_value(&mut self, column: impl Into<Column>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        let entry = self.columns.entry(column.clone()).or_default();
        if !entry.values.remove(&value) {
            entry.values.insert(value);
        }
        self.prune(&column);
    }

    pub fn select_values<I, S>(&mut self, column: impl Into<Column>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = column.into();
        self.columns
            .entry(column.clone())
            .or_default()
            .values
            .extend(values.into_iter().map(Into::into));
        self.prune(&column);
    }

    pub fn clear_values(&mut self, column: &str) {
        if let Some(entry) = self.columns.get_mut(column) {
            entry.values.clear();
        }
        self.prune(column);
    }

    pub fn clear_column(&mut self, column: &str) {
        self.columns.remove(column);
    }

    pub fn column(&self, column: &str) -> Option<&ColumnFilter> {
        self.columns.get(column)
    }

    /// True when no criterion would reject any row
    pub fn is_empty(&self) -> bool {
        self.global_search.is_empty() && self.columns.values().all(|f| !f.is_active())
    }

    fn prune(&mut self, column: &str) {
        if self.columns.get(column).is_some_and(|f| !f.is_active()) {
            self.columns.remove(column);
        }
    }
}

struct ColumnPredicate<'a> {
    column: &'a str,
    pattern: Option<CompiledPattern>,
    values: &'a BTreeSet<String>,
}

/// A [`FilterState`] with its patterns compiled, optionally ignoring one
/// column's own criteria.
pub struct CompiledFilter<'a> {
    global: Option<String>,
    predicates: Vec<ColumnPredicate<'a>>,
}

impl<'a> CompiledFilter<'a> {
    pub fn new(state: &'a FilterState, excluded: Option<&str>) -> Self {
        let global = if state.global_search.is_empty() {
            None
        } else {
            Some(state.global_search.to_lowercase())
        };

        let predicates = state
            .columns
            .iter()
            .filter(|(column, filter)| filter.is_active() && Some(column.as_str()) != excluded)
            .map(|(column, filter)| ColumnPredicate {
                column: column.as_str(),
                pattern: filter.active_search().map(CompiledPattern::compile),
                values: &filter.values,
            })
            .collect();

        CompiledFilter { global, predicates }
    }

    pub fn matches(&self, row: &FlatRow) -> bool {
        if let Some(term) = &self.global {
            let hit = row
                .iter()
                .any(|(_, value)| value.coerce().to_lowercase().contains(term.as_str()));
            if !hit {
                return false;
            }
        }

        self.predicates.iter().all(|predicate| {
            let cell = row.coerced(predicate.column);
            if let Some(pattern) = &predicate.pattern {
                if !pattern.is_match(&cell) {
                    return false;
                }
            }
            predicate.values.is_empty() || predicate.values.contains(&cell)
        })
    }
}

/// Indices of the rows passing every criterion, in input order
pub fn apply(rows: &[FlatRow], state: &FilterState) -> Vec<usize> {
    select(rows, &CompiledFilter::new(state, None))
}

/// Indices of the rows passing every criterion except `excluded`'s own
pub fn apply_excluding(rows: &[FlatRow], state: &FilterState, excluded: &str) -> Vec<usize> {
    select(rows, &CompiledFilter::new(state, Some(excluded)))
}

fn select(rows: &[FlatRow], filter: &CompiledFilter<'_>) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| filter.matches(row))
        .map(|(idx, _)| idx)
        .collect()
}
