//! Schema registry: the sorted union of flattened columns

use crate::types::Column;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest level that gets its own bucket
pub const MAX_LEVEL: u8 = 6;

/// Display bucket for a column's nesting depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Level(u8),
    Deep,
}

impl HierarchyLevel {
    pub fn from_depth(depth: usize) -> Self {
        if depth <= MAX_LEVEL as usize {
            HierarchyLevel::Level(depth as u8)
        } else {
            HierarchyLevel::Deep
        }
    }

    /// CSS-style class name (`level-0` .. `level-6`, `level-deep`)
    pub fn class_name(self) -> String {
        match self {
            HierarchyLevel::Level(n) => format!("level-{}", n),
            HierarchyLevel::Deep => "level-deep".to_string(),
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class_name())
    }
}

/// Nesting depth of a column: number of `.` plus number of `[`
pub fn depth(column: &str) -> usize {
    column.chars().filter(|c| *c == '.' || *c == '[').count()
}

/// Ordered, deduplicated column list for the current dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Deduplicate and sort byte-wise. Repeated calls over the same key set
    /// produce the same order.
    pub fn derive<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = Column>,
    {
        let mut columns: Vec<Column> = keys.into_iter().collect();
        columns.sort_unstable();
        columns.dedup();
        Schema { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .binary_search_by(|probe| probe.as_str().cmp(column))
            .ok()
    }

    pub fn level(&self, column: &str) -> HierarchyLevel {
        HierarchyLevel::from_depth(depth(column))
    }

    /// Columns whose name contains `term`, ignoring case, in schema order.
    /// An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&Column> {
        let needle = term.trim().to_lowercase();
        self.columns
            .iter()
            .filter(|column| needle.is_empty() || column.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }
}
