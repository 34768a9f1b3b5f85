//! Merging the base schema with extension columns.
//!
//! [`resolve`] is a pure function: the same base and extensions always
//! produce an identical [`EffectiveColumnSet`]. Ordering is base columns
//! in declared order, then extensions in declaration order. An override
//! extension takes the slot of the base column it replaces.

use std::collections::HashMap;

use rotation_types::{ColumnDefinition, ColumnSource};
use serde::{Serialize, Serializer};

use crate::config::ExtensionColumn;
use crate::error::{ColumnConfigError, ConflictKind};

/// An ordered, name-unique, immutable set of column definitions.
#[derive(Debug, Clone, Default)]
pub struct EffectiveColumnSet {
    columns: Vec<ColumnDefinition>,
    index: HashMap<String, usize>,
}

impl EffectiveColumnSet {
    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDefinition> {
        self.index.get(name).and_then(|&i| self.columns.get(i))
    }

    /// Whether a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a column in the canonical ordering.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Iterate columns in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDefinition> {
        self.columns.iter()
    }

    /// Column names in canonical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the set has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Borrow the columns as a slice.
    pub fn as_slice(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}

impl PartialEq for EffectiveColumnSet {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for EffectiveColumnSet {}

impl Serialize for EffectiveColumnSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.columns)
    }
}

impl<'a> IntoIterator for &'a EffectiveColumnSet {
    type Item = &'a ColumnDefinition;
    type IntoIter = std::slice::Iter<'a, ColumnDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Merge `base` and `extensions` into one effective column set.
///
/// # Errors
///
/// - [`ColumnConfigError::Conflict`] when an extension reuses a base name
///   without `override`, two extensions share a name, or the base itself
///   repeats a name.
/// - [`ColumnConfigError::DanglingOverride`] when an override matches no
///   base column.
/// - [`ColumnConfigError::InvalidColumn`] for malformed extensions.
pub fn resolve(
    base: &[ColumnDefinition],
    extensions: &[ExtensionColumn],
) -> Result<EffectiveColumnSet, ColumnConfigError> {
    let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(base.len().saturating_add(extensions.len()));
    let mut index: HashMap<String, usize> = HashMap::with_capacity(columns.capacity());

    for def in base {
        if index.contains_key(&def.name) {
            return Err(ColumnConfigError::Conflict {
                name: def.name.clone(),
                kind: ConflictKind::DuplicateBase,
            });
        }
        index.insert(def.name.clone(), columns.len());
        columns.push(ColumnDefinition {
            source: ColumnSource::Base,
            ..def.clone()
        });
    }

    let mut overridden: Vec<&str> = Vec::new();
    for ext in extensions {
        ext.check()?;
        let existing = index.get(&ext.name).copied();
        match (existing, ext.overrides_base) {
            (Some(slot), true) => {
                if overridden.contains(&ext.name.as_str()) {
                    return Err(ColumnConfigError::Conflict {
                        name: ext.name.clone(),
                        kind: ConflictKind::DuplicateExtension,
                    });
                }
                overridden.push(&ext.name);
                if let Some(target) = columns.get_mut(slot) {
                    *target = ext.to_definition();
                }
            }
            (Some(slot), false) => {
                let kind = match columns.get(slot).map(|c| c.source) {
                    Some(ColumnSource::Extension) => ConflictKind::DuplicateExtension,
                    _ => ConflictKind::BaseCollision,
                };
                return Err(ColumnConfigError::Conflict {
                    name: ext.name.clone(),
                    kind,
                });
            }
            (None, true) => {
                return Err(ColumnConfigError::DanglingOverride {
                    name: ext.name.clone(),
                });
            }
            (None, false) => {
                index.insert(ext.name.clone(), columns.len());
                columns.push(ext.to_definition());
            }
        }
    }

    Ok(EffectiveColumnSet { columns, index })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rotation_types::ValueKind;

    use super::*;

    fn base() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::base("name", ValueKind::String),
            ColumnDefinition::base("size", ValueKind::Number),
        ]
    }

    #[test]
    fn base_then_extensions_in_order() {
        let set = resolve(&base(), &[ExtensionColumn::new("region", ValueKind::String)]).unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, ["name", "size", "region"]);
        assert_eq!(set.get("region").map(|c| c.source), Some(ColumnSource::Extension));
        assert_eq!(set.get("name").map(|c| c.source), Some(ColumnSource::Base));
    }

    #[test]
    fn collision_without_override_is_conflict() {
        let err = resolve(&base(), &[ExtensionColumn::new("size", ValueKind::String)]);
        assert!(matches!(
            err,
            Err(ColumnConfigError::Conflict { kind: ConflictKind::BaseCollision, .. })
        ));
    }

    #[test]
    fn collision_detected_regardless_of_position() {
        let extensions = [
            ExtensionColumn::new("a", ValueKind::String),
            ExtensionColumn::new("b", ValueKind::Number),
            ExtensionColumn::new("name", ValueKind::Boolean),
        ];
        for rotation in 0..extensions.len() {
            let mut rotated = extensions.to_vec();
            rotated.rotate_left(rotation);
            let err = resolve(&base(), &rotated).unwrap_err();
            assert!(err.is_conflict());
        }
    }

    #[test]
    fn override_replaces_base_in_place() {
        let set = resolve(
            &base(),
            &[ExtensionColumn::new("size", ValueKind::String).overriding()],
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.position("size"), Some(1));
        let size = set.get("size").unwrap();
        assert_eq!(size.value_kind, ValueKind::String);
        assert_eq!(size.source, ColumnSource::Extension);
    }

    #[test]
    fn duplicate_extensions_conflict() {
        let err = resolve(
            &base(),
            &[
                ExtensionColumn::new("region", ValueKind::String),
                ExtensionColumn::new("region", ValueKind::String),
            ],
        );
        assert!(matches!(
            err,
            Err(ColumnConfigError::Conflict { kind: ConflictKind::DuplicateExtension, .. })
        ));
    }

    #[test]
    fn dangling_override_is_rejected() {
        let err = resolve(
            &base(),
            &[ExtensionColumn::new("region", ValueKind::String).overriding()],
        );
        assert!(matches!(err, Err(ColumnConfigError::DanglingOverride { .. })));
    }

    #[test]
    fn duplicate_base_is_rejected() {
        let mut dup = base();
        dup.push(ColumnDefinition::base("name", ValueKind::String));
        let err = resolve(&dup, &[]);
        assert!(matches!(
            err,
            Err(ColumnConfigError::Conflict { kind: ConflictKind::DuplicateBase, .. })
        ));
    }

    #[test]
    fn resolution_is_idempotent() {
        let extensions = [
            ExtensionColumn::new("region", ValueKind::String),
            ExtensionColumn::new("balance", ValueKind::Number).computed(),
        ];
        let first = resolve(&base(), &extensions).unwrap();
        let second = resolve(&base(), &extensions).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn base_definitions_are_stamped_as_base() {
        let mut odd = ColumnDefinition::base("name", ValueKind::String);
        odd.source = ColumnSource::Extension;
        let set = resolve(&[odd], &[]).unwrap();
        assert_eq!(set.get("name").map(|c| c.source), Some(ColumnSource::Base));
    }
}
