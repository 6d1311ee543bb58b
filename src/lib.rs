//! # Ingot - JSON to queryable tables
//!
//! Flattens an arbitrary JSON document (an object, or an array of objects)
//! into rows of `column -> scalar` cells and queries them with composable
//! filtering, tri-state sorting and pagination.
//!
//! ## Modules
//!
//! - **flatten**: JSON parsing, extraction paths, repair and flattening
//! - **schema**: sorted column registry with hierarchy levels
//! - **query**: filter engine, sort engine, pagination and facet cache
//! - **engine**: the current dataset, with single-flight loading
//! - **session**: interactive filter/sort/page state and its persistence
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::{FilterState, PaginationState, Session, SortState};
//!
//! # fn main() -> ingot::Result<()> {
//! let mut session = Session::default();
//! session.load_str(
//!     r#"{"data": [
//!         {"id": 1, "user": {"name": "Alice", "tags": ["x", "y"]}},
//!         {"id": 2, "user": {"name": "Bob", "tags": ["z"]}}
//!     ]}"#,
//!     Some("data"),
//! )?;
//!
//! // columns: id, user.name, user.tags[0], user.tags[1]
//! assert_eq!(session.current_page().columns.len(), 4);
//!
//! session.set_global_search("bob");
//! let page = session.current_page();
//! assert_eq!(page.rows[0].coerced("user.name"), "Bob");
//!
//! // The same query as a pure function of the engine's dataset
//! let page = session.engine().query(
//!     &FilterState::new().with_selected_values("id", ["1"]),
//!     &SortState::none(),
//!     &PaginationState::default(),
//! );
//! assert_eq!(page.total_rows(), 1);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod flatten;
pub mod query;
pub mod schema;
pub mod session;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

// Re-export commonly used types for convenience
pub use engine::{Dataset, Engine, ExportView, QueryResult};
pub use error::{IngotError, Result};
pub use flatten::{available_paths, beautify, extract_path, parse_json, Flattener};
pub use query::{
    ColumnFilter, Facet, FilterState, PaginationState, SortDirection, SortState, UniqueValueCache,
};
pub use schema::{HierarchyLevel, Schema};
pub use session::Session;
pub use stats::DataStats;
pub use store::{KeyValueStore, MemoryStore};
pub use types::{Column, EngineConfig, FlatRow, Scalar};
pub use writer::RowWriter;

/// Parse, flatten and derive the schema in one call, without an engine
pub fn flatten_str(
    text: &str,
    path: Option<&str>,
    config: &EngineConfig,
) -> Result<(Vec<FlatRow>, Schema)> {
    let value = parse_json(text)?;
    let target = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => extract_path(&value, path)?,
        None => &value,
    };
    let output = Flattener::new(config).flatten(target)?;
    Ok((output.rows, Schema::derive(output.columns)))
}
