//! Query engine over the layer catalog.
//!
//! The engine performs no I/O. It is handed catalog rows by a
//! [`LayerCatalog`] and returns filtered views: flat rows, or rows
//! partitioned into groups by a tuple of column values. Group order is
//! the first-occurrence order of each key in the scan.
//!
//! # Modules
//!
//! - [`catalog`] -- The [`LayerCatalog`] seam and an in-memory catalog.
//! - [`engine`] -- [`query`], [`query_with`], and [`distinct_values`].
//! - [`error`] -- [`QueryError`] and [`CatalogError`].
//! - [`group`] -- Group keys with per-kind equality.
//! - [`order`] -- Sorting and paging of result lists.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod group;
pub mod order;

pub use catalog::{InMemoryCatalog, LayerCatalog};
pub use engine::{
    ColumnValues, QueryRequest, QueryResult, RowGroup, Selection, distinct_values, query,
    query_with,
};
pub use error::{CatalogError, QueryError};
pub use group::GroupKey;
pub use order::{Page, Sort, SortDirection};
