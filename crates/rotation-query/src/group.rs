//! Group keys.
//!
//! A group key is the tuple of a row's values for the grouping columns.
//! Key parts compare with the equality of the value's kind: strings
//! case-sensitively, numbers numerically (so `0.0` and `-0.0` share a
//! group), enum-sets by membership.

use std::collections::BTreeSet;

use rotation_types::{ColumnValue, RowValues};

/// One component of a [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Boolean(bool),
    Number(u64),
    String(String),
    Set(BTreeSet<String>),
}

impl KeyPart {
    fn of(value: &ColumnValue) -> Self {
        match value {
            ColumnValue::Null => Self::Null,
            ColumnValue::Boolean(b) => Self::Boolean(*b),
            ColumnValue::Number(n) => Self::Number(number_bits(*n)),
            ColumnValue::String(s) => Self::String(s.clone()),
            ColumnValue::Set(members) => Self::Set(members.clone()),
        }
    }
}

/// Bit pattern under which numerically equal values hash equally.
fn number_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0_f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// The tuple of grouping-column values identifying a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<KeyPart>);

impl GroupKey {
    /// Build the key of `row` over `columns`. Absent values are `null`.
    pub fn of<R: RowValues + ?Sized>(row: &R, columns: &[String]) -> Self {
        Self(
            columns
                .iter()
                .map(|c| row.value(c).map_or(KeyPart::Null, KeyPart::of))
                .collect(),
        )
    }

    /// Build a single-column key from one value.
    pub fn single(value: &ColumnValue) -> Self {
        Self(vec![KeyPart::of(value)])
    }
}

#[cfg(test)]
mod tests {
    use rotation_types::CatalogRow;

    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn strings_are_case_sensitive() {
        let a = CatalogRow::new().with("Map", "Narva");
        let b = CatalogRow::new().with("Map", "narva");
        assert_ne!(GroupKey::of(&a, &cols(&["Map"])), GroupKey::of(&b, &cols(&["Map"])));
    }

    #[test]
    fn signed_zeros_share_a_key() {
        let a = CatalogRow::new().with("Balance", 0.0);
        let b = CatalogRow::new().with("Balance", -0.0);
        assert_eq!(
            GroupKey::of(&a, &cols(&["Balance"])),
            GroupKey::of(&b, &cols(&["Balance"]))
        );
    }

    #[test]
    fn sets_compare_by_membership() {
        let a = CatalogRow::new().with(
            "Tags",
            ColumnValue::Set(["night", "large"].into_iter().map(String::from).collect()),
        );
        let b = CatalogRow::new().with(
            "Tags",
            ColumnValue::Set(["large", "night"].into_iter().map(String::from).collect()),
        );
        assert_eq!(GroupKey::of(&a, &cols(&["Tags"])), GroupKey::of(&b, &cols(&["Tags"])));
    }

    #[test]
    fn missing_value_is_null() {
        let a = CatalogRow::new();
        let b = CatalogRow::new().with("Map", ColumnValue::Null);
        assert_eq!(GroupKey::of(&a, &cols(&["Map"])), GroupKey::of(&b, &cols(&["Map"])));
    }
}
