//! Comparison leaves and the operator legality table.
//!
//! | Kind | Operators |
//! |------|-----------|
//! | string | `eq`, `neq`, `in`, `notin` |
//! | number | `eq`, `neq`, `lt`, `gt`, `inrange` |
//! | boolean | `is-true`, `eq`, `neq` |
//! | enum-set | `has`, `in`, `notin` |

use std::cmp::Ordering;

use rotation_types::{ColumnValue, Scalar, ValueKind};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single column comparison, discriminated by its operator `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "code", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Comparison {
    /// Value equals the operand.
    Eq {
        /// Column compared.
        column: String,
        /// Operand.
        value: Scalar,
    },
    /// Value differs from the operand.
    Neq {
        /// Column compared.
        column: String,
        /// Operand.
        value: Scalar,
    },
    /// Value is one of the operands (enum-set: shares a member with them).
    In {
        /// Column compared.
        column: String,
        /// Candidate operands.
        values: Vec<Scalar>,
    },
    /// Value is none of the operands (enum-set: shares no member with them).
    #[serde(rename = "notin")]
    NotIn {
        /// Column compared.
        column: String,
        /// Excluded operands.
        values: Vec<Scalar>,
    },
    /// Value is strictly less than the operand.
    Lt {
        /// Column compared.
        column: String,
        /// Upper bound (exclusive).
        value: f64,
    },
    /// Value is strictly greater than the operand.
    Gt {
        /// Column compared.
        column: String,
        /// Lower bound (exclusive).
        value: f64,
    },
    /// Value lies in an inclusive range. The smaller bound is always the
    /// start, even if given second.
    #[serde(rename = "inrange")]
    InRange {
        /// Column compared.
        column: String,
        /// `[start, end]`; at least one bound is required.
        range: (Option<f64>, Option<f64>),
    },
    /// Boolean value is `true`.
    IsTrue {
        /// Column compared.
        column: String,
    },
    /// Enum-set value contains the operand.
    Has {
        /// Column compared.
        column: String,
        /// Required member.
        value: String,
    },
}

/// Operator codes, without operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `eq`
    Eq,
    /// `neq`
    Neq,
    /// `in`
    In,
    /// `notin`
    NotIn,
    /// `lt`
    Lt,
    /// `gt`
    Gt,
    /// `inrange`
    InRange,
    /// `is-true`
    IsTrue,
    /// `has`
    Has,
}

impl Operator {
    /// Wire code of the operator.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::InRange => "inrange",
            Self::IsTrue => "is-true",
            Self::Has => "has",
        }
    }

    /// Whether the operator may be applied to a column of `kind`.
    pub const fn is_legal_for(self, kind: ValueKind) -> bool {
        match self {
            Self::Lt | Self::Gt | Self::InRange => kind.is_ordered(),
            Self::Eq | Self::Neq => !matches!(kind, ValueKind::EnumSet),
            Self::In | Self::NotIn => matches!(kind, ValueKind::String | ValueKind::EnumSet),
            Self::IsTrue => matches!(kind, ValueKind::Boolean),
            Self::Has => matches!(kind, ValueKind::EnumSet),
        }
    }

    /// All operators legal for `kind`, for populating operator pickers.
    pub fn legal_for(kind: ValueKind) -> Vec<Self> {
        [
            Self::Eq,
            Self::Neq,
            Self::In,
            Self::NotIn,
            Self::Lt,
            Self::Gt,
            Self::InRange,
            Self::IsTrue,
            Self::Has,
        ]
        .into_iter()
        .filter(|op| op.is_legal_for(kind))
        .collect()
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl Comparison {
    /// The column this comparison reads.
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. }
            | Self::Neq { column, .. }
            | Self::In { column, .. }
            | Self::NotIn { column, .. }
            | Self::Lt { column, .. }
            | Self::Gt { column, .. }
            | Self::InRange { column, .. }
            | Self::IsTrue { column }
            | Self::Has { column, .. } => column,
        }
    }

    /// The comparison's operator.
    pub const fn operator(&self) -> Operator {
        match self {
            Self::Eq { .. } => Operator::Eq,
            Self::Neq { .. } => Operator::Neq,
            Self::In { .. } => Operator::In,
            Self::NotIn { .. } => Operator::NotIn,
            Self::Lt { .. } => Operator::Lt,
            Self::Gt { .. } => Operator::Gt,
            Self::InRange { .. } => Operator::InRange,
            Self::IsTrue { .. } => Operator::IsTrue,
            Self::Has { .. } => Operator::Has,
        }
    }

    /// Evaluate against a stored value.
    ///
    /// Type mismatches evaluate to `false` for every operator, including
    /// the negative ones (`neq`, `notin`).
    pub fn matches(&self, value: &ColumnValue) -> bool {
        match self {
            Self::Eq { value: operand, .. } => scalar_eq(value, operand).unwrap_or(false),
            Self::Neq { value: operand, .. } => scalar_eq(value, operand).is_some_and(|eq| !eq),
            Self::In { values, .. } => match value {
                ColumnValue::Set(members) => values
                    .iter()
                    .any(|v| matches!(v, Scalar::String(s) if members.contains(s))),
                _ => values
                    .iter()
                    .any(|v| scalar_eq(value, v).unwrap_or(false)),
            },
            Self::NotIn { values, .. } => match value {
                ColumnValue::Set(members) => !values
                    .iter()
                    .any(|v| matches!(v, Scalar::String(s) if members.contains(s))),
                _ => values
                    .iter()
                    .map(|v| scalar_eq(value, v))
                    .try_fold(true, |acc, eq| eq.map(|eq| acc && !eq))
                    .unwrap_or(false),
            },
            Self::Lt { value: bound, .. } => value
                .as_number()
                .is_some_and(|n| n.partial_cmp(bound) == Some(Ordering::Less)),
            Self::Gt { value: bound, .. } => value
                .as_number()
                .is_some_and(|n| n.partial_cmp(bound) == Some(Ordering::Greater)),
            Self::InRange { range, .. } => {
                let Some(n) = value.as_number() else {
                    return false;
                };
                let (start, end) = normalized_range(*range);
                let above = start.is_none_or(|s| n >= s);
                let below = end.is_none_or(|e| n <= e);
                !n.is_nan() && above && below
            }
            Self::IsTrue { .. } => value.as_bool() == Some(true),
            Self::Has { value: member, .. } => value
                .as_set()
                .is_some_and(|members| members.contains(member)),
        }
    }
}

/// Order the bounds of a range so the smaller one is the start.
pub(crate) fn normalized_range(range: (Option<f64>, Option<f64>)) -> (Option<f64>, Option<f64>) {
    match range {
        (Some(a), Some(b)) if b < a => (Some(b), Some(a)),
        other => other,
    }
}

/// Equality between a stored value and an operand.
///
/// Returns `None` when the two are of incomparable types. `Null` compares
/// equal only to `Null` and unequal to any other operand.
fn scalar_eq(value: &ColumnValue, operand: &Scalar) -> Option<bool> {
    match (value, operand) {
        (ColumnValue::Null, Scalar::Null) => Some(true),
        (ColumnValue::Null, _) | (_, Scalar::Null) => Some(false),
        (ColumnValue::String(a), Scalar::String(b)) => Some(a == b),
        (ColumnValue::Number(a), Scalar::Number(b)) => {
            Some(a.partial_cmp(b) == Some(Ordering::Equal))
        }
        (ColumnValue::Boolean(a), Scalar::Boolean(b)) => Some(a == b),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn set(members: &[&str]) -> ColumnValue {
        ColumnValue::Set(members.iter().map(|m| (*m).to_owned()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn wire_codes_round_trip_through_serde() {
        let json = r#"{"code": "notin", "column": "Map", "values": ["Narva", null]}"#;
        let comp: Comparison = serde_json::from_str(json).unwrap();
        assert_eq!(comp.operator(), Operator::NotIn);
        assert_eq!(comp.column(), "Map");

        let is_true: Comparison = serde_json::from_str(r#"{"code": "is-true", "column": "Night"}"#).unwrap();
        assert_eq!(is_true.operator(), Operator::IsTrue);
    }

    #[test]
    fn legality_table() {
        assert!(Operator::Gt.is_legal_for(ValueKind::Number));
        assert!(!Operator::Gt.is_legal_for(ValueKind::String));
        assert!(!Operator::Lt.is_legal_for(ValueKind::EnumSet));
        assert!(Operator::Has.is_legal_for(ValueKind::EnumSet));
        assert_eq!(
            Operator::legal_for(ValueKind::String),
            vec![Operator::Eq, Operator::Neq, Operator::In, Operator::NotIn]
        );
        assert_eq!(
            Operator::legal_for(ValueKind::Number),
            vec![Operator::Eq, Operator::Neq, Operator::Lt, Operator::Gt, Operator::InRange]
        );
    }

    #[test]
    fn range_operators_need_an_ordered_kind() {
        let kinds = [ValueKind::String, ValueKind::Number, ValueKind::Boolean, ValueKind::EnumSet];
        for kind in kinds {
            for op in [Operator::Lt, Operator::Gt, Operator::InRange] {
                assert_eq!(op.is_legal_for(kind), kind.is_ordered(), "{op} on {}", kind.as_str());
            }
        }
    }

    #[test]
    fn string_equality_is_case_sensitive() {
        let comp = Comparison::Eq {
            column: String::from("Map"),
            value: Scalar::from("Narva"),
        };
        assert!(comp.matches(&ColumnValue::from("Narva")));
        assert!(!comp.matches(&ColumnValue::from("narva")));
    }

    #[test]
    fn type_mismatch_is_false_for_negative_operators() {
        let neq = Comparison::Neq {
            column: String::from("Size"),
            value: Scalar::from("big"),
        };
        assert!(!neq.matches(&ColumnValue::from(3)));

        let notin = Comparison::NotIn {
            column: String::from("Size"),
            values: vec![Scalar::from("big")],
        };
        assert!(!notin.matches(&ColumnValue::from(3)));
    }

    #[test]
    fn null_handling() {
        let eq_null = Comparison::Eq {
            column: String::from("LayerVersion"),
            value: Scalar::Null,
        };
        assert!(eq_null.matches(&ColumnValue::Null));
        assert!(!eq_null.matches(&ColumnValue::from("V1")));

        let neq = Comparison::Neq {
            column: String::from("LayerVersion"),
            value: Scalar::from("V1"),
        };
        assert!(neq.matches(&ColumnValue::Null));
    }

    #[test]
    fn range_normalizes_bounds_and_is_inclusive() {
        let comp = Comparison::InRange {
            column: String::from("Balance"),
            range: (Some(10.0), Some(2.0)),
        };
        assert!(comp.matches(&ColumnValue::from(2)));
        assert!(comp.matches(&ColumnValue::from(10)));
        assert!(!comp.matches(&ColumnValue::from(11)));

        let open = Comparison::InRange {
            column: String::from("Balance"),
            range: (None, Some(0.0)),
        };
        assert!(open.matches(&ColumnValue::from(-5)));
        assert!(!open.matches(&ColumnValue::Number(f64::NAN)));
    }

    #[test]
    fn enum_set_membership() {
        let tags = set(&["night", "armor"]);
        let has = Comparison::Has {
            column: String::from("Tags"),
            value: String::from("night"),
        };
        assert!(has.matches(&tags));

        let any = Comparison::In {
            column: String::from("Tags"),
            values: vec![Scalar::from("heli"), Scalar::from("armor")],
        };
        assert!(any.matches(&tags));

        let none = Comparison::NotIn {
            column: String::from("Tags"),
            values: vec![Scalar::from("heli")],
        };
        assert!(none.matches(&tags));
        assert!(!none.matches(&set(&["heli"])));
    }
}
