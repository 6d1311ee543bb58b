//! The loaded dataset and the engine that owns it
//!
//! An [`Engine`] holds exactly one current [`Dataset`]. Loads are
//! single-flight: a load that starts while another is running is rejected
//! with [`IngotError::LoadInProgress`]. A failed load leaves the previous
//! dataset in place. Queries read an `Arc` snapshot and never block a load.

use crate::error::{IngotError, Result};
use crate::flatten::{extract_path, parse_json, FlattenOutput, Flattener};
use crate::query::facets::{self, Facet, FacetLimits, UniqueValueCache};
use crate::query::{filter, page, sort, FilterState, PageWindow, PaginationState, SortState};
use crate::schema::Schema;
use crate::stats::DataStats;
use crate::types::{Column, EngineConfig, FlatRow};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Immutable result of one successful load
#[derive(Debug)]
pub struct Dataset {
    rows: Vec<FlatRow>,
    schema: Schema,
    stats: DataStats,
    collisions: usize,
    cache: Mutex<UniqueValueCache>,
}

impl Dataset {
    fn new(source: &Value, output: FlattenOutput, config: &EngineConfig) -> Self {
        let schema = Schema::derive(output.columns);
        let stats = DataStats::new(source, output.rows.len(), schema.len());
        let cache = UniqueValueCache::build(
            &output.rows,
            schema.columns(),
            FacetLimits::from_config(config),
            config.parallel,
        );
        Dataset {
            rows: output.rows,
            schema,
            stats,
            collisions: output.collisions,
            cache: Mutex::new(cache),
        }
    }

    /// Rows in flattened (natural) order
    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        self.schema.columns()
    }

    pub fn stats(&self) -> DataStats {
        self.stats
    }

    /// Cells overwritten by embedded JSON during flattening
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Filter then sort; returns row indices
    pub fn select(&self, filters: &FilterState, sort_state: &SortState) -> Vec<usize> {
        let filtered = filter::apply(&self.rows, filters);
        sort::apply(&self.rows, &filtered, sort_state)
    }

    /// One page of the filtered, sorted rows
    pub fn query(
        &self,
        filters: &FilterState,
        sort_state: &SortState,
        pagination: &PaginationState,
    ) -> QueryResult {
        let ordered = self.select(filters, sort_state);
        self.page_of(&ordered, pagination)
    }

    /// Materialize one page from an already ordered index list
    pub fn page_of(&self, ordered: &[usize], pagination: &PaginationState) -> QueryResult {
        let (indices, window) = page::slice(ordered, pagination);
        QueryResult {
            rows: indices.iter().map(|&idx| self.rows[idx].clone()).collect(),
            columns: self.schema.columns().to_vec(),
            start_row: window.start_row(),
            end_row: window.end_row(),
            window,
        }
    }

    /// Cached distinct values of `column` over every row
    pub fn unique_values(&self, column: &str) -> Arc<Facet> {
        self.cache.lock().get_or_compute(&self.rows, column)
    }

    /// Distinct values of `column` over rows passing every other criterion
    pub fn unique_values_excluding(&self, column: &str, filters: &FilterState) -> Facet {
        let limits = self.cache.lock().limits();
        facets::collect_excluding(&self.rows, filters, column, limits)
    }

    /// Filtered and sorted rows with the full schema, unpaginated
    pub fn export(&self, filters: &FilterState, sort_state: &SortState) -> ExportView {
        let ordered = self.select(filters, sort_state);
        self.export_of(&ordered)
    }

    pub fn export_of(&self, ordered: &[usize]) -> ExportView {
        ExportView {
            columns: self.schema.columns().to_vec(),
            rows: ordered.iter().map(|&idx| self.rows[idx].clone()).collect(),
        }
    }
}

/// One page handed to a rendering collaborator
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub rows: Vec<FlatRow>,
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub window: PageWindow,
    pub start_row: usize,
    pub end_row: usize,
}

impl QueryResult {
    pub fn total_rows(&self) -> usize {
        self.window.total_count
    }

    pub fn total_pages(&self) -> usize {
        self.window.total_pages
    }

    pub fn current_page(&self) -> usize {
        self.window.page
    }

    /// False when nothing matched; pagination should be hidden
    pub fn is_paginated(&self) -> bool {
        self.window.is_visible()
    }
}

/// Everything an exporter needs: the table's own column list and the
/// filtered rows, so exported and displayed schemas never diverge.
#[derive(Debug, Clone, Serialize)]
pub struct ExportView {
    pub columns: Vec<Column>,
    pub rows: Vec<FlatRow>,
}

impl ExportView {
    /// Cells aligned to `columns`; missing and null cells are empty strings
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|column| row.coerced(column)).collect())
    }
}

/// Resets the in-flight flag when a load finishes, fails or panics
struct LoadGuard<'a>(&'a AtomicBool);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the current dataset
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    flattener: Flattener,
    current: RwLock<Option<Arc<Dataset>>>,
    loading: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            flattener: Flattener::new(&config),
            config,
            current: RwLock::new(None),
            loading: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse `text`, optionally extract `path`, flatten and replace the
    /// current dataset.
    pub fn load_str(&self, text: &str, path: Option<&str>) -> Result<Arc<Dataset>> {
        let _guard = self.begin_load()?;
        let value = parse_json(text)?;
        self.load_locked(&value, path)
    }

    /// Like [`Engine::load_str`] for an already parsed document
    pub fn load(&self, value: &Value, path: Option<&str>) -> Result<Arc<Dataset>> {
        let _guard = self.begin_load()?;
        self.load_locked(value, path)
    }

    fn begin_load(&self) -> Result<LoadGuard<'_>> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("rejected load: another load is in progress");
            return Err(IngotError::LoadInProgress);
        }
        Ok(LoadGuard(&self.loading))
    }

    fn load_locked(&self, value: &Value, path: Option<&str>) -> Result<Arc<Dataset>> {
        let started = Instant::now();
        let target = match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => {
                let target = extract_path(value, path)?;
                debug!(path, "extracted sub-document");
                target
            }
            None => value,
        };

        let output = self.flattener.flatten(target)?;
        let dataset = Arc::new(Dataset::new(target, output, &self.config));

        *self.current.write() = Some(dataset.clone());

        info!(
            rows = dataset.len(),
            columns = dataset.schema().len(),
            collisions = dataset.collisions(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded dataset"
        );
        Ok(dataset)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Snapshot of the current dataset
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.current.read().clone()
    }

    /// Pure function of the current dataset and the three state objects.
    /// With nothing loaded the result is an empty, unpaginated page.
    pub fn query(
        &self,
        filters: &FilterState,
        sort_state: &SortState,
        pagination: &PaginationState,
    ) -> QueryResult {
        match self.dataset() {
            Some(dataset) => dataset.query(filters, sort_state, pagination),
            None => empty_result(pagination),
        }
    }

    pub fn unique_values(&self, column: &str) -> Arc<Facet> {
        self.dataset()
            .map(|dataset| dataset.unique_values(column))
            .unwrap_or_default()
    }

    pub fn unique_values_excluding(&self, column: &str, filters: &FilterState) -> Facet {
        self.dataset()
            .map(|dataset| dataset.unique_values_excluding(column, filters))
            .unwrap_or_default()
    }
}

pub(crate) fn empty_result(pagination: &PaginationState) -> QueryResult {
    let window = page::window(0, pagination);
    QueryResult {
        rows: Vec::new(),
        columns: Vec::new(),
        start_row: 0,
        end_row: 0,
        window,
    }
}
