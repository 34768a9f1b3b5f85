//! Shared type definitions for the Rotation workspace.
//!
//! This crate is the single source of truth for the data model shared by
//! the column resolver, the filter evaluator, the query engine, and the
//! queue state fan-out channel. UI-facing types derive [`ts_rs::TS`] so
//! the operator dashboard can consume the same shapes.
//!
//! # Modules
//!
//! - [`ids`] -- Strongly-typed identifiers.
//! - [`value`] -- Column value kinds, stored values, and comparison operands.
//! - [`column`] -- Column definitions and their provenance.
//! - [`row`] -- Catalog rows and by-name value lookup.
//! - [`queue`] -- Authoritative layer queue snapshots and their heavy parts.

pub mod column;
pub mod ids;
pub mod queue;
pub mod row;
pub mod value;

pub use column::{ColumnDefinition, ColumnSource};
pub use ids::{ChannelId, SubscriberId};
pub use queue::{
    LayerStatuses, MatchHistoryEntry, QueueItem, QueueParts, QueueStateUpdate, UserSummary,
};
pub use row::{CatalogRow, RowValues};
pub use value::{ColumnValue, Scalar, ValueKind};
