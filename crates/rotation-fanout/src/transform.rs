//! Snapshot preprocessing applied once per upstream push.

use std::sync::Arc;

use rotation_types::QueueStateUpdate;

use crate::parts::PartsStore;

/// Transform applied to each upstream snapshot before it is cached and
/// fanned out.
///
/// Runs exactly once per snapshot, never per subscriber.
pub trait SnapshotTransform<T>: Send + Sync {
    /// Transform one snapshot.
    fn apply(&self, snapshot: T) -> T;
}

impl<T, F> SnapshotTransform<T> for F
where
    F: Fn(T) -> T + Send + Sync,
{
    fn apply(&self, snapshot: T) -> T {
        self(snapshot)
    }
}

/// Strip transform for queue snapshots: moves `parts` into a
/// [`PartsStore`] and forwards the snapshot without them.
#[derive(Debug, Clone)]
pub struct StripParts {
    store: Arc<PartsStore>,
}

impl StripParts {
    /// Strip into `store`.
    pub const fn new(store: Arc<PartsStore>) -> Self {
        Self { store }
    }

    /// The store receiving stripped parts.
    pub const fn store(&self) -> &Arc<PartsStore> {
        &self.store
    }
}

impl SnapshotTransform<QueueStateUpdate> for StripParts {
    fn apply(&self, mut snapshot: QueueStateUpdate) -> QueueStateUpdate {
        if let Some(parts) = snapshot.parts.take() {
            self.store.absorb(parts);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rotation_types::{QueueParts, UserSummary};

    use super::*;

    #[test]
    fn strip_moves_parts_into_store() {
        let store = Arc::new(PartsStore::new());
        let strip = StripParts::new(Arc::clone(&store));
        let raw = QueueStateUpdate {
            server_id: String::from("main"),
            seq_id: 1,
            pushed_at: Utc::now(),
            layer_queue: Vec::new(),
            parts: Some(QueueParts {
                users: vec![UserSummary {
                    user_id: String::from("42"),
                    username: String::from("admin"),
                }],
                ..QueueParts::default()
            }),
        };
        let stripped = strip.apply(raw);
        assert!(!stripped.has_parts());
        assert!(store.user("42").is_some());
    }

    #[test]
    fn closures_are_transforms() {
        let double = |n: u32| n.saturating_mul(2);
        assert_eq!(SnapshotTransform::apply(&double, 4), 8);
    }
}
