//! Extension column configuration.
//!
//! Deployments describe their extra catalog columns in a YAML (`.yaml`,
//! `.yml`) or JSON (`.json`) file:
//!
//! ```yaml
//! columns:
//!   - name: Region
//!     type: string
//!     allowedValues: [eu, na, asia]
//!   - name: Balance
//!     type: float
//!     computed: true
//! ```
//!
//! Each entry is parsed into an [`ExtensionColumn`] with a fixed
//! provenance. Name collisions are checked eagerly by
//! [`resolve`](crate::resolve::resolve), not on first use.

use std::path::{Path, PathBuf};

use rotation_types::{ColumnDefinition, ColumnSource, ValueKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ColumnConfigError;

/// One deployment-supplied column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtensionColumn {
    /// Unique column name.
    pub name: String,
    /// Declared value kind.
    #[serde(rename = "type", alias = "valueKind")]
    pub value_kind: ValueKind,
    /// UI label; defaults to the name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Optional abbreviated label.
    #[serde(default)]
    pub short_name: Option<String>,
    /// Whether values are derived rather than stored.
    #[serde(default)]
    pub computed: bool,
    /// Replace the base column of the same name instead of conflicting.
    #[serde(default, rename = "override")]
    pub overrides_base: bool,
    /// Whether every row is expected to carry a value.
    #[serde(default)]
    pub not_null: bool,
    /// Closed enumeration of legal values (string columns only).
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

impl ExtensionColumn {
    /// Create a plain extension column.
    pub fn new(name: impl Into<String>, value_kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            value_kind,
            display_name: None,
            short_name: None,
            computed: false,
            overrides_base: false,
            not_null: false,
            allowed_values: None,
        }
    }

    /// Mark the column as an explicit override of a base column.
    #[must_use]
    pub const fn overriding(mut self) -> Self {
        self.overrides_base = true;
        self
    }

    /// Mark the column as computed.
    #[must_use]
    pub const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Check the definition in isolation.
    pub(crate) fn check(&self) -> Result<(), ColumnConfigError> {
        let invalid = |reason: &str| ColumnConfigError::InvalidColumn {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(invalid("name must not contain whitespace"));
        }
        if self.allowed_values.is_some() && self.value_kind != ValueKind::String {
            return Err(invalid("allowedValues is only valid for string columns"));
        }
        Ok(())
    }

    /// Convert into an effective column definition with extension provenance.
    pub fn to_definition(&self) -> ColumnDefinition {
        ColumnDefinition {
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
            short_name: self.short_name.clone(),
            value_kind: self.value_kind,
            computed: self.computed,
            source: ColumnSource::Extension,
            not_null: self.not_null,
            allowed_values: self.allowed_values.clone(),
        }
    }
}

/// Top-level structure of an extension column file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionColumnsConfig {
    /// Extension columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ExtensionColumn>,
}

impl ExtensionColumnsConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError::Yaml`] if the document is malformed.
    pub fn parse_yaml(yaml: &str) -> Result<Self, ColumnConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError::Json`] if the document is malformed.
    pub fn parse_json(json: &str) -> Result<Self, ColumnConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, choosing the parser by extension.
    ///
    /// A missing file is an error: callers that want "no extensions" must
    /// say so by not configuring a path at all.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError::Io`] if the file cannot be read,
    /// [`ColumnConfigError::UnsupportedFormat`] for unknown extensions,
    /// or a parse error.
    pub fn from_file(path: &Path) -> Result<Self, ColumnConfigError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let contents = std::fs::read_to_string(path).map_err(|source| ColumnConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match format.as_deref() {
            Some("yaml" | "yml") => Self::parse_yaml(&contents)?,
            Some("json") => Self::parse_json(&contents)?,
            _ => {
                return Err(ColumnConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        debug!(
            path = %path.display(),
            columns = config.columns.len(),
            "Extension column config loaded"
        );
        Ok(config)
    }
}

/// Something that can supply the extension column list on demand.
///
/// Called once at startup and again on every explicit reload.
pub trait ExtensionSource: Send + Sync {
    /// Produce the current extension list.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError`] if the configuration cannot be read
    /// or parsed.
    fn load(&self) -> Result<Vec<ExtensionColumn>, ColumnConfigError>;
}

/// Extension columns read from a file on every load.
#[derive(Debug, Clone)]
pub struct ExtensionFile {
    path: PathBuf,
}

impl ExtensionFile {
    /// Create a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExtensionSource for ExtensionFile {
    fn load(&self) -> Result<Vec<ExtensionColumn>, ColumnConfigError> {
        ExtensionColumnsConfig::from_file(&self.path).map(|c| c.columns)
    }
}

impl ExtensionSource for Vec<ExtensionColumn> {
    fn load(&self) -> Result<Vec<ExtensionColumn>, ColumnConfigError> {
        Ok(self.clone())
    }
}
