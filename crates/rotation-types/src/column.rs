//! Column definitions and their provenance.
//!
//! A [`ColumnDefinition`] describes one catalog attribute: its name, its
//! [`ValueKind`], and whether it comes from the fixed base schema or from
//! a deployment-supplied extension. The effective column set merges both
//! provenances into one ordered, name-unique list.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::value::{ColumnValue, ValueKind};

/// Where a column definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum ColumnSource {
    /// Declared by the fixed base schema.
    Base,
    /// Declared by the deployment's extension configuration.
    Extension,
}

/// A single column in an effective column set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ColumnDefinition {
    /// Unique column name, used as the row lookup key.
    pub name: String,
    /// Label shown in operator UIs.
    pub display_name: String,
    /// Optional abbreviated label for narrow table headers.
    #[serde(default)]
    pub short_name: Option<String>,
    /// Declared value kind.
    pub value_kind: ValueKind,
    /// Whether values are derived rather than stored.
    #[serde(default)]
    pub computed: bool,
    /// Provenance of the definition.
    pub source: ColumnSource,
    /// Whether every row is expected to carry a non-null value.
    #[serde(default)]
    pub not_null: bool,
    /// Closed enumeration of legal values for string columns.
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

impl ColumnDefinition {
    /// Create a base column with the display name equal to `name`.
    pub fn base(name: impl Into<String>, value_kind: ValueKind) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            short_name: None,
            value_kind,
            computed: false,
            source: ColumnSource::Base,
            not_null: false,
            allowed_values: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Restrict the column to an enumerated list of values.
    #[must_use]
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the column as non-nullable.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Whether `value` is a member of this column's enumeration.
    ///
    /// Columns without an enumeration accept every value.
    pub fn allows(&self, value: &str) -> bool {
        self.allowed_values
            .as_ref()
            .is_none_or(|values| values.iter().any(|v| v == value))
    }

    /// Whether a stored value is compatible with this column.
    pub const fn admits(&self, value: &ColumnValue) -> bool {
        self.value_kind.admits(value)
    }
}
