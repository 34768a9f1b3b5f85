//! Configuration and command interface of the layer rotation service.
//!
//! [`RotationService`] wires the column registry, the filter store, the
//! layer catalog, and the queue state fan-out channel together behind the
//! handful of entry points callers need: start a selection, subscribe to
//! queue state, unsubscribe, and reload the column configuration.
//!
//! # Modules
//!
//! - [`config`] -- [`ServiceConfig`] loaded from YAML with env overrides.
//! - [`error`] -- [`ServiceError`].
//! - [`service`] -- [`RotationService`] and selection results.

pub mod config;
pub mod error;
pub mod service;

pub use config::{
    CatalogConfig, ColumnsConfig, ConfigError, LogFormat, LoggingConfig, ObserverConfig,
    ServiceConfig, UpstreamConfig,
};
pub use error::ServiceError;
pub use service::{LayerGroup, RotationService, SelectionOutput, SelectionResult};
