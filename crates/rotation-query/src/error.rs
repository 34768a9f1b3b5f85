//! Query and catalog errors.

use std::path::PathBuf;

use rotation_filter::ValidationError;

/// Errors from loading catalog rows.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The catalog file is not a JSON array of rows.
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Errors from [`query`](crate::query) and friends.
///
/// Errors propagate unmodified; a bad filter never degrades to "match all".
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A grouping, sort, or target column is not in the effective set.
    #[error("unknown column {column:?}")]
    UnknownColumn {
        /// The unknown name.
        column: String,
    },

    /// The filter failed validation.
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] ValidationError),

    /// The catalog could not supply rows.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
