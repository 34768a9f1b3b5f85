//! Catalog rows and by-name value lookup.
//!
//! The query engine and filter evaluator only need to look up a row's
//! value by column name. [`RowValues`] captures that requirement so the
//! storage layer can hand over its own row type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::value::ColumnValue;

/// By-name value lookup over a catalog row.
pub trait RowValues {
    /// Look up the value stored under `column`.
    ///
    /// Returns `None` when the row has no entry for the column, which the
    /// evaluator treats the same as [`ColumnValue::Null`].
    fn value(&self, column: &str) -> Option<&ColumnValue>;
}

impl RowValues for BTreeMap<String, ColumnValue> {
    fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.get(column)
    }
}

impl<T: RowValues + ?Sized> RowValues for &T {
    fn value(&self, column: &str) -> Option<&ColumnValue> {
        (**self).value(column)
    }
}

/// A row of the layer catalog, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogRow {
    /// Values keyed by column name.
    pub values: BTreeMap<String, ColumnValue>,
}

impl CatalogRow {
    /// Create an empty row.
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values.insert(column.into(), value.into());
    }
}

impl RowValues for CatalogRow {
    fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }
}

impl FromIterator<(String, ColumnValue)> for CatalogRow {
    fn from_iter<I: IntoIterator<Item = (String, ColumnValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
