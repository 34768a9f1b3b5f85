//! Stored, named filters.
//!
//! A [`FilterEntity`] is a filter tree saved under a stable ID so other
//! trees can reference it with an `apply-filter` node. The
//! [`FilterStore`] keeps entities in memory and refuses any write that
//! would leave a dangling or recursive reference behind.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use rotation_columns::EffectiveColumnSet;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError as FieldError, ValidationErrors};

use crate::error::ValidationError;
use crate::node::{FilterNode, RawFilterNode};
use crate::validate::{FilterResolver, validate_root};

/// IDs reserved by the operator UI's routes.
const RESERVED_IDS: [&str; 2] = ["_id", "new"];

/// A named filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FilterEntity {
    /// Stable identifier referenced by `apply-filter` nodes.
    #[validate(length(min = 3, max = 64), custom(function = "check_filter_id"))]
    pub id: String,
    /// Display name.
    #[validate(length(min = 3, max = 128))]
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    #[validate(length(min = 3, max = 2048))]
    pub description: Option<String>,
    /// Optional emoji shown next to the name.
    #[serde(default)]
    pub emoji: Option<String>,
    /// The filter tree; its root must be an `and`/`or` block.
    #[ts(as = "RawFilterNode")]
    pub filter: FilterNode,
}

impl FilterEntity {
    /// Create an entity without description or emoji.
    pub fn new(id: impl Into<String>, name: impl Into<String>, filter: FilterNode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            emoji: None,
            filter,
        }
    }

    /// Builder-style description setter.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn check_filter_id(id: &str) -> Result<(), FieldError> {
    let legal = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
    if !id.chars().all(legal) {
        let mut err = FieldError::new("filter_id_charset");
        err.message =
            Some("must contain only lowercase letters, numbers, hyphens, and underscores".into());
        return Err(err);
    }
    if RESERVED_IDS.contains(&id) {
        let mut err = FieldError::new("filter_id_reserved");
        err.message = Some("this id is reserved".into());
        return Err(err);
    }
    Ok(())
}

/// Errors from [`FilterStore`] writes.
#[derive(Debug, thiserror::Error)]
pub enum FilterStoreError {
    /// The entity's fields violate their constraints.
    #[error("invalid filter entity: {0}")]
    Invalid(#[from] ValidationErrors),

    /// The entity's tree failed validation.
    #[error(transparent)]
    Filter(#[from] ValidationError),

    /// No entity is stored under the ID.
    #[error("filter {id:?} not found")]
    NotFound {
        /// The requested ID.
        id: String,
    },

    /// Other stored filters still reference the entity.
    #[error("filter {id:?} is referenced by {referenced_by:?}")]
    InUse {
        /// The entity that could not be removed.
        id: String,
        /// IDs of the entities referencing it.
        referenced_by: Vec<String>,
    },
}

/// In-memory store of named filters.
#[derive(Debug, Default)]
pub struct FilterStore {
    entities: RwLock<BTreeMap<String, Arc<FilterEntity>>>,
}

impl FilterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entity by ID.
    pub fn get(&self, id: &str) -> Option<Arc<FilterEntity>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All entities, ordered by ID.
    pub fn list(&self) -> Vec<Arc<FilterEntity>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace an entity after validating it against `columns`.
    ///
    /// References are resolved against the store as it would be after the
    /// write, so an update that closes a reference cycle is rejected.
    ///
    /// # Errors
    ///
    /// - [`FilterStoreError::Invalid`] if a field violates its constraints.
    /// - [`FilterStoreError::Filter`] if the tree fails validation.
    pub fn upsert(
        &self,
        entity: FilterEntity,
        columns: &EffectiveColumnSet,
    ) -> Result<Arc<FilterEntity>, FilterStoreError> {
        entity.validate()?;
        let entity = Arc::new(entity);
        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let overlay = Overlay {
            stored: &*entities,
            pending: &*entity,
        };
        validate_root(&entity.filter, columns, &overlay)?;

        let replaced = entities.insert(entity.id.clone(), Arc::clone(&entity));
        tracing::info!(
            filter_id = %entity.id,
            nodes = entity.filter.node_count(),
            replaced = replaced.is_some(),
            "Filter stored"
        );
        Ok(entity)
    }

    /// Remove an entity.
    ///
    /// # Errors
    ///
    /// - [`FilterStoreError::NotFound`] if no entity has the ID.
    /// - [`FilterStoreError::InUse`] if another entity references it.
    pub fn delete(&self, id: &str) -> Result<Arc<FilterEntity>, FilterStoreError> {
        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !entities.contains_key(id) {
            return Err(FilterStoreError::NotFound { id: id.to_owned() });
        }
        let referenced_by: Vec<String> = entities
            .values()
            .filter(|e| e.id != id && e.filter.contains_filter_id(id))
            .map(|e| e.id.clone())
            .collect();
        if !referenced_by.is_empty() {
            return Err(FilterStoreError::InUse {
                id: id.to_owned(),
                referenced_by,
            });
        }
        let removed = entities
            .remove(id)
            .ok_or_else(|| FilterStoreError::NotFound { id: id.to_owned() })?;
        tracing::info!(filter_id = %id, "Filter deleted");
        Ok(removed)
    }
}

impl FilterResolver for FilterStore {
    fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>> {
        self.get(id).map(|e| Arc::new(e.filter.clone()))
    }
}

/// The stored entities with one pending write applied on top.
struct Overlay<'a> {
    stored: &'a BTreeMap<String, Arc<FilterEntity>>,
    pending: &'a FilterEntity,
}

impl FilterResolver for Overlay<'_> {
    fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>> {
        if id == self.pending.id {
            return Some(Arc::new(self.pending.filter.clone()));
        }
        self.stored.get(id).map(|e| Arc::new(e.filter.clone()))
    }
}
