//! Catalog row sources.

use std::path::Path;
use std::sync::Arc;

use rotation_types::CatalogRow;

use crate::error::CatalogError;

/// Supplier of layer catalog rows.
///
/// A scan must return rows in a stable order for the lifetime of the
/// returned slice; grouping order depends on it.
pub trait LayerCatalog: Send + Sync {
    /// All rows of the catalog.
    fn scan(&self) -> Result<Arc<[CatalogRow]>, CatalogError>;
}

/// A catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    rows: Arc<[CatalogRow]>,
}

impl InMemoryCatalog {
    /// Wrap a list of rows.
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows: rows.into() }
    }

    /// Load rows from a JSON file holding an array of row objects.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rows: Vec<CatalogRow> =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Layer catalog loaded");
        Ok(Self::new(rows))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl LayerCatalog for InMemoryCatalog {
    fn scan(&self) -> Result<Arc<[CatalogRow]>, CatalogError> {
        Ok(Arc::clone(&self.rows))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write as _;

    use rotation_types::{ColumnValue, RowValues};

    use super::*;

    #[test]
    fn loads_rows_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "Narva_RAAS_v1", "Map": "Narva", "Balance": 2.5}}, {{"id": "Gorodok_AAS_v1", "Map": "Gorodok"}}]"#
        )
        .unwrap();
        let catalog = InMemoryCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        let rows = catalog.scan().unwrap();
        assert_eq!(
            rows.first().and_then(|r| r.value("Balance")),
            Some(&ColumnValue::Number(2.5))
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = InMemoryCatalog::from_json_file(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(err, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn non_array_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": "x"}}"#).unwrap();
        let err = InMemoryCatalog::from_json_file(file.path());
        assert!(matches!(err, Err(CatalogError::Parse { .. })));
    }
}
