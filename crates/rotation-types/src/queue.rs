//! Authoritative layer queue snapshots.
//!
//! The game-server side pushes a whole [`QueueStateUpdate`] every time the
//! queue changes. Each update may carry [`QueueParts`]: heavy lookup data
//! (user records, layer statuses, match history) that is stripped before
//! the update is cached or fanned out to observers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One authoritative queue snapshot pushed by the upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueStateUpdate {
    /// Game server the queue belongs to.
    pub server_id: String,
    /// Monotonic sequence number assigned by the queue owner.
    pub seq_id: u64,
    /// When the upstream produced this snapshot.
    pub pushed_at: DateTime<Utc>,
    /// Upcoming layers, in play order.
    pub layer_queue: Vec<QueueItem>,
    /// Heavy lookup data. Absent once the snapshot has been stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<QueueParts>,
}

impl QueueStateUpdate {
    /// Whether heavy parts are still attached.
    pub const fn has_parts(&self) -> bool {
        self.parts.is_some()
    }
}

/// A single entry of the layer queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueItem {
    /// Stable identifier of the queue entry.
    pub item_id: String,
    /// Catalog ID of the selected layer.
    pub layer_id: String,
    /// User who queued the layer, if known.
    #[serde(default)]
    pub added_by: Option<String>,
}

/// Heavy substructures attached to a raw snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueParts {
    /// User records referenced by the queue.
    #[serde(default)]
    pub users: Vec<UserSummary>,
    /// Per-layer constraint statuses for the current queue.
    #[serde(default)]
    pub layer_statuses: Option<LayerStatuses>,
    /// Recent match history entries.
    #[serde(default)]
    pub match_history: Vec<MatchHistoryEntry>,
}

impl QueueParts {
    /// Whether no part carries any data.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.layer_statuses.is_none() && self.match_history.is_empty()
    }
}

/// Minimal user record referenced from queue entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UserSummary {
    /// External account identifier.
    pub user_id: String,
    /// Display name.
    pub username: String,
}

/// Constraint statuses of the layers currently in the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LayerStatuses {
    /// Layer ID to the names of the constraints blocking it.
    #[serde(default)]
    pub blocked: BTreeMap<String, Vec<String>>,
    /// Layer IDs present in the queue.
    #[serde(default)]
    pub present: BTreeSet<String>,
}

/// One entry of the server's match history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MatchHistoryEntry {
    /// Unique history entry identifier.
    pub history_entry_id: u64,
    /// Layer that was played.
    pub layer_id: String,
    /// When the match started, if recorded.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}
