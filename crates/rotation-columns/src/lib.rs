//! Effective column resolution for the layer catalog.
//!
//! The catalog has a fixed base schema (map, layer, factions, ...) and
//! each deployment may add extension columns through a configuration
//! file. This crate merges both into one ordered, name-unique
//! [`EffectiveColumnSet`] consumed by the filter evaluator and the query
//! engine.
//!
//! # Modules
//!
//! - [`base`] -- The fixed base layer columns.
//! - [`config`] -- Extension column configuration and file loading.
//! - [`error`] -- [`ColumnConfigError`].
//! - [`resolve`] -- The pure [`resolve`](resolve::resolve) function and
//!   [`EffectiveColumnSet`].
//! - [`registry`] -- [`ColumnRegistry`], the shared, atomically replaced
//!   current column set.

pub mod base;
pub mod config;
pub mod error;
pub mod registry;
pub mod resolve;

pub use base::{GROUP_BY_COLUMNS, base_layer_columns};
pub use config::{ExtensionColumn, ExtensionColumnsConfig, ExtensionFile, ExtensionSource};
pub use error::{ColumnConfigError, ConflictKind};
pub use registry::ColumnRegistry;
pub use resolve::{EffectiveColumnSet, resolve};
