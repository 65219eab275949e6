//! Filtered, paginated document search with per-category counts.

pub mod engine;
pub mod filter;

pub use engine::{clamp_per_page, search, CategoryCount, SearchHit, SearchResults};
pub use filter::{Clause, PredicateSet, SearchFilters};
