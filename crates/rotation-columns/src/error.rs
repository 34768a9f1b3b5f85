//! Error types for column configuration and resolution.

use std::path::PathBuf;

/// Why two column definitions could not be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// An extension reuses a base column name without the override flag.
    BaseCollision,
    /// Two extensions declare the same name.
    DuplicateExtension,
    /// The base schema itself declares a name twice.
    DuplicateBase,
}

impl core::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::BaseCollision => "collides with a base column (set `override: true` to replace it)",
            Self::DuplicateExtension => "is declared by more than one extension",
            Self::DuplicateBase => "is declared twice in the base schema",
        })
    }
}

/// Errors that can occur while loading or resolving column configuration.
#[derive(Debug, thiserror::Error)]
pub enum ColumnConfigError {
    /// Two definitions claim the same column name.
    #[error("column config conflict: `{name}` {kind}")]
    Conflict {
        /// The contested column name.
        name: String,
        /// What kind of collision occurred.
        kind: ConflictKind,
    },

    /// An extension is flagged as an override but no base column has its name.
    #[error("column `{name}` is marked as an override but no base column has that name")]
    DanglingOverride {
        /// The extension column name.
        name: String,
    },

    /// A single extension definition is malformed.
    #[error("invalid column `{name}`: {reason}")]
    InvalidColumn {
        /// The offending column name (may be empty).
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read column config {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML.
    #[error("failed to parse column config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("failed to parse column config JSON: {source}")]
    Json {
        /// The underlying JSON parse error.
        #[from]
        source: serde_json::Error,
    },

    /// The file extension is neither YAML nor JSON.
    #[error("unsupported column config format: {}", path.display())]
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },
}

impl ColumnConfigError {
    /// Whether this error is a name conflict between definitions.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::DanglingOverride { .. })
    }
}
