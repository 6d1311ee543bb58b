//! Querying a flattened dataset: filter, sort, paginate and facet lookups
//!
//! Every stage works on row indices into the dataset's immutable row list,
//! so the flattened order is always available to fall back to.

pub mod facets;
pub mod filter;
pub mod page;
pub mod pattern;
pub mod sort;

pub use facets::{Facet, FacetLimits, UniqueValueCache};
pub use filter::{ColumnFilter, CompiledFilter, FilterState};
pub use page::{PageWindow, PaginationState};
pub use pattern::CompiledPattern;
pub use sort::{SortDirection, SortState};
