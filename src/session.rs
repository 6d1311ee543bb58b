//! Interactive query session: one dataset plus the filter, sort and
//! pagination state a table view works with.

use crate::engine::{empty_result, Dataset, Engine, ExportView, QueryResult};
use crate::error::Result;
use crate::query::{filter, page, sort, Facet, FilterState, PaginationState, SortState};
use crate::store::{KeyValueStore, COLUMN_FILTERS_KEY, COLUMN_SEARCH_KEY};
use crate::types::{Column, EngineConfig};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Consolidated view state over an [`Engine`]
///
/// Every filter change re-runs the filter engine over the dataset and moves
/// back to page 1. Sorting works on the filtered indices; the dataset keeps
/// the flattened order, so clearing the sort restores it exactly.
#[derive(Debug)]
pub struct Session {
    engine: Arc<Engine>,
    dataset: Option<Arc<Dataset>>,
    filters: FilterState,
    sort: SortState,
    pagination: PaginationState,
    filtered: Vec<usize>,
    ordered: Vec<usize>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Session::with_engine(Arc::new(Engine::new(config)))
    }

    /// Share an engine between sessions. Each session keeps the snapshot it
    /// last loaded.
    pub fn with_engine(engine: Arc<Engine>) -> Self {
        let page_size = engine.config().default_page_size;
        Session {
            dataset: engine.dataset(),
            engine,
            filters: FilterState::default(),
            sort: SortState::default(),
            pagination: PaginationState::first(page_size),
            filtered: Vec::new(),
            ordered: Vec::new(),
        }
        .refreshed()
    }

    fn refreshed(mut self) -> Self {
        self.refilter();
        self
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    /// Number of rows passing the current filters
    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn load_str(&mut self, text: &str, path: Option<&str>) -> Result<Arc<Dataset>> {
        let dataset = self.engine.load_str(text, path)?;
        self.install(dataset.clone());
        Ok(dataset)
    }

    pub fn load_value(&mut self, value: &Value, path: Option<&str>) -> Result<Arc<Dataset>> {
        let dataset = self.engine.load(value, path)?;
        self.install(dataset.clone());
        Ok(dataset)
    }

    /// A new dataset discards filters and sort and returns to page 1.
    /// The page size is kept.
    fn install(&mut self, dataset: Arc<Dataset>) {
        self.dataset = Some(dataset);
        self.filters = FilterState::default();
        self.sort = SortState::default();
        self.refilter();
    }

    /// Replace the whole filter state
    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.refilter();
    }

    pub fn set_global_search(&mut self, term: impl Into<String>) {
        self.filters.global_search = term.into();
        self.refilter();
    }

    pub fn set_column_search(&mut self, column: &str, pattern: impl Into<String>) {
        self.filters.set_column_search(column, pattern);
        self.refilter();
    }

    pub fn toggle_value(&mut self, column: &str, value: impl Into<String>) {
        self.filters.toggle_value(column, value);
        self.refilter();
    }

    /// Select every cached facet value of `column`
    pub fn select_all_values(&mut self, column: &str) {
        let facet = self.unique_values(column);
        self.filters.select_values(column, facet.values.iter().cloned());
        self.refilter();
    }

    pub fn deselect_all_values(&mut self, column: &str) {
        self.filters.clear_values(column);
        self.refilter();
    }

    pub fn clear_column_filter(&mut self, column: &str) {
        self.filters.clear_column(column);
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterState::default();
        self.refilter();
    }

    /// Click on a column header
    pub fn toggle_sort(&mut self, column: &str) -> &SortState {
        self.sort = self.sort.toggle(column);
        self.pagination = self.pagination.with_page(1);
        self.resort();
        &self.sort
    }

    pub fn set_sort(&mut self, sort_state: SortState) {
        self.sort = sort_state;
        self.pagination = self.pagination.with_page(1);
        self.resort();
    }

    /// Move to `page`. Requests outside `[1, total_pages]` are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.pagination = self.pagination.with_page(page);
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.pagination.page() + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.pagination.page().saturating_sub(1))
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to_page(self.total_pages())
    }

    /// Change the page size and return to page 1. Zero is rejected.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == 0 {
            return false;
        }
        self.pagination = PaginationState::first(page_size);
        true
    }

    pub fn total_pages(&self) -> usize {
        page::total_pages(self.ordered.len(), self.pagination.page_size())
    }

    /// The page a table view should render now
    pub fn current_page(&self) -> QueryResult {
        match &self.dataset {
            Some(dataset) => dataset.page_of(&self.ordered, &self.pagination),
            None => empty_result(&self.pagination),
        }
    }

    /// Filtered, sorted rows for an exporter, unpaginated
    pub fn export(&self) -> ExportView {
        match &self.dataset {
            Some(dataset) => dataset.export_of(&self.ordered),
            None => ExportView {
                columns: Vec::new(),
                rows: Vec::new(),
            },
        }
    }

    pub fn unique_values(&self, column: &str) -> Arc<Facet> {
        self.dataset
            .as_ref()
            .map(|dataset| dataset.unique_values(column))
            .unwrap_or_default()
    }

    /// Values of `column` still reachable under every other active filter
    pub fn unique_values_excluding(&self, column: &str) -> Facet {
        self.dataset
            .as_ref()
            .map(|dataset| dataset.unique_values_excluding(column, &self.filters))
            .unwrap_or_default()
    }

    /// Write the filter state to `store`
    pub fn save_state<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let searches: BTreeMap<&Column, &String> = self
            .filters
            .columns
            .iter()
            .filter_map(|(column, f)| f.search.as_ref().map(|search| (column, search)))
            .collect();

        store.set(COLUMN_SEARCH_KEY, serde_json::to_string(&searches)?)?;
        store.set(COLUMN_FILTERS_KEY, serde_json::to_string(&self.filters)?)?;
        Ok(())
    }

    /// Restore filters from `store` and re-run the filter engine.
    ///
    /// The full filter state is read first; a column-search map, when present,
    /// then overrides the searches (columns missing from the map lose theirs).
    /// Returns false when the store held nothing to restore.
    pub fn restore_state<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> Result<bool> {
        let mut filters = self.filters.clone();
        let mut restored = false;

        if let Some(raw) = store.get(COLUMN_FILTERS_KEY)? {
            filters = serde_json::from_str(&raw)?;
            restored = true;
        }

        if let Some(raw) = store.get(COLUMN_SEARCH_KEY)? {
            let searches: BTreeMap<Column, String> = serde_json::from_str(&raw)?;
            let stale: Vec<Column> = filters
                .columns
                .iter()
                .filter(|(column, f)| f.search.is_some() && !searches.contains_key(*column))
                .map(|(column, _)| column.clone())
                .collect();
            for column in stale {
                filters.set_column_search(column, "");
            }
            for (column, search) in searches {
                filters.set_column_search(column, search);
            }
            restored = true;
        }

        if restored {
            debug!(columns = filters.columns.len(), "restored filter state");
            self.set_filters(filters);
        }
        Ok(restored)
    }

    /// Forget the saved column searches (done after a fresh load)
    pub fn clear_saved_search<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.remove(COLUMN_SEARCH_KEY)
    }

    fn refilter(&mut self) {
        self.filtered = match &self.dataset {
            Some(dataset) => filter::apply(dataset.rows(), &self.filters),
            None => Vec::new(),
        };
        self.pagination = self.pagination.with_page(1);
        debug!(matched = self.filtered.len(), "applied filters");
        self.resort();
    }

    fn resort(&mut self) {
        self.ordered = match &self.dataset {
            Some(dataset) => sort::apply(dataset.rows(), &self.filtered, &self.sort),
            None => Vec::new(),
        };
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(EngineConfig::default())
    }
}
