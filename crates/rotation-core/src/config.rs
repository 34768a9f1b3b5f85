//! Service configuration.
//!
//! The configuration lives in a YAML file (`rotation.yaml` by default).
//! Every section is optional and falls back to the defaults below.
//! Deployment-specific values can be overridden through environment
//! variables without touching the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value {value:?} for {variable}: {reason}")]
    InvalidOverride {
        /// The environment variable.
        variable: &'static str,
        /// Its value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Extension column configuration.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Layer catalog source.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Upstream queue state source.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Observer HTTP API.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `NATS_URL` overrides `upstream.nats_url`
    /// - `ROTATION_OBSERVER_PORT` overrides `observer.port`
    /// - `ROTATION_EXTENSION_COLUMNS` overrides `columns.extension_file`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed override.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document is a valid, all-defaults configuration.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if `ROTATION_OBSERVER_PORT`
    /// is not a port number.
    pub fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = var("NATS_URL") {
            self.upstream.nats_url = url;
        }
        if let Some(port) = var("ROTATION_OBSERVER_PORT") {
            self.observer.port =
                port.parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidOverride {
                        variable: "ROTATION_OBSERVER_PORT",
                        value: port.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(path) = var("ROTATION_EXTENSION_COLUMNS") {
            self.columns.extension_file = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

/// Extension column configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColumnsConfig {
    /// Path of the extension column file (`.yaml`, `.yml`, or `.json`).
    ///
    /// Unset means no extension columns. A set path that does not exist
    /// is an error at startup and on reload.
    #[serde(default)]
    pub extension_file: Option<PathBuf>,
}

/// Layer catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// JSON file holding the catalog rows. Unset means an empty catalog.
    #[serde(default)]
    pub rows_file: Option<PathBuf>,
}

/// Upstream queue state configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamConfig {
    /// Whether to connect to NATS at all. When disabled, queue state is
    /// only available from an in-process source.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying JSON queue state snapshots.
    #[serde(default = "default_queue_subject")]
    pub subject: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nats_url: default_nats_url(),
            subject: default_queue_subject(),
        }
    }
}

/// Observer API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when
    /// set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_nats_url() -> String {
    String::from("nats://localhost:4222")
}

fn default_queue_subject() -> String {
    String::from("rotation.queue.state")
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}
