//! Service errors.

use rotation_columns::ColumnConfigError;
use rotation_filter::FilterStoreError;
use rotation_query::{CatalogError, QueryError};

/// Errors surfaced by [`RotationService`](crate::RotationService).
///
/// Configuration conflicts and invalid filters are caller mistakes and
/// are returned as-is; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Extension column configuration could not be loaded or resolved.
    #[error(transparent)]
    Columns(#[from] ColumnConfigError),

    /// The layer catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A selection failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A named filter could not be stored or removed.
    #[error(transparent)]
    Filter(#[from] FilterStoreError),
}
