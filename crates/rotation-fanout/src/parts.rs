//! Storage for the heavy queue parts stripped from snapshots.
//!
//! Observers that need user records, layer statuses, or match history
//! read them here instead of receiving them with every snapshot.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use rotation_types::{LayerStatuses, MatchHistoryEntry, QueueParts, UserSummary};

#[derive(Debug, Default)]
struct Parts {
    users: BTreeMap<String, UserSummary>,
    layer_statuses: Option<LayerStatuses>,
    match_history: BTreeMap<u64, MatchHistoryEntry>,
    absorbed: u64,
}

/// Accumulated queue parts.
///
/// Users are upserted by ID, layer statuses are replaced wholesale, and
/// match history entries are upserted by entry ID.
#[derive(Debug, Default)]
pub struct PartsStore {
    parts: RwLock<Parts>,
}

impl PartsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one snapshot's parts into the store.
    pub fn absorb(&self, incoming: QueueParts) {
        let mut parts = self.parts.write().unwrap_or_else(PoisonError::into_inner);
        for user in incoming.users {
            parts.users.insert(user.user_id.clone(), user);
        }
        if let Some(statuses) = incoming.layer_statuses {
            parts.layer_statuses = Some(statuses);
        }
        for entry in incoming.match_history {
            parts.match_history.insert(entry.history_entry_id, entry);
        }
        parts.absorbed = parts.absorbed.saturating_add(1);
    }

    /// Look up a user by ID.
    pub fn user(&self, user_id: &str) -> Option<UserSummary> {
        self.read().users.get(user_id).cloned()
    }

    /// The latest layer statuses.
    pub fn layer_statuses(&self) -> Option<LayerStatuses> {
        self.read().layer_statuses.clone()
    }

    /// Match history ordered by entry ID.
    pub fn match_history(&self) -> Vec<MatchHistoryEntry> {
        self.read().match_history.values().cloned().collect()
    }

    /// Everything stored, in the same shape as a snapshot's parts.
    pub fn snapshot(&self) -> QueueParts {
        let parts = self.read();
        QueueParts {
            users: parts.users.values().cloned().collect(),
            layer_statuses: parts.layer_statuses.clone(),
            match_history: parts.match_history.values().cloned().collect(),
        }
    }

    /// How many snapshots' parts have been absorbed.
    pub fn absorbed(&self) -> u64 {
        self.read().absorbed
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Parts> {
        self.parts.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> UserSummary {
        UserSummary {
            user_id: id.to_owned(),
            username: name.to_owned(),
        }
    }

    fn history(id: u64, layer: &str) -> MatchHistoryEntry {
        MatchHistoryEntry {
            history_entry_id: id,
            layer_id: layer.to_owned(),
            started_at: None,
        }
    }

    #[test]
    fn users_upsert_by_id() {
        let store = PartsStore::new();
        store.absorb(QueueParts {
            users: vec![user("1", "old"), user("2", "other")],
            ..QueueParts::default()
        });
        store.absorb(QueueParts {
            users: vec![user("1", "new")],
            ..QueueParts::default()
        });
        assert_eq!(store.user("1").map(|u| u.username), Some(String::from("new")));
        assert_eq!(store.snapshot().users.len(), 2);
        assert_eq!(store.absorbed(), 2);
    }

    #[test]
    fn statuses_replace_only_when_present() {
        let store = PartsStore::new();
        let mut statuses = LayerStatuses::default();
        statuses.present.insert(String::from("NV-RAAS-V1"));
        store.absorb(QueueParts {
            layer_statuses: Some(statuses.clone()),
            ..QueueParts::default()
        });
        store.absorb(QueueParts::default());
        assert_eq!(store.layer_statuses(), Some(statuses));
    }

    #[test]
    fn history_upserts_by_entry_and_orders_by_id() {
        let store = PartsStore::new();
        store.absorb(QueueParts {
            match_history: vec![history(7, "A"), history(3, "B")],
            ..QueueParts::default()
        });
        store.absorb(QueueParts {
            match_history: vec![history(7, "C")],
            ..QueueParts::default()
        });
        let layers: Vec<String> = store.match_history().into_iter().map(|e| e.layer_id).collect();
        assert_eq!(layers, vec![String::from("B"), String::from("C")]);
    }
}
