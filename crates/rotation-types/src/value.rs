//! Column value kinds, stored values, and comparison operands.
//!
//! A [`ValueKind`] is declared once per column. Catalog rows carry
//! [`ColumnValue`]s, and filter comparisons carry [`Scalar`] operands.
//! Equality semantics are per kind: strings compare case-sensitively,
//! numbers numerically, and enum-sets as sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The declared kind of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum ValueKind {
    /// UTF-8 string, compared case-sensitively.
    String,
    /// Numeric value (stored as `f64`). Accepts the `float` and
    /// `integer` spellings used by older column configs.
    #[serde(alias = "float", alias = "integer")]
    Number,
    /// Boolean flag.
    Boolean,
    /// Set of enumerated string members.
    EnumSet,
}

impl ValueKind {
    /// Whether values of this kind have a total order usable by `lt`,
    /// `gt`, and `inrange`.
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::Number)
    }

    /// Whether the stored value has this kind. `Null` matches every kind.
    pub const fn admits(self, value: &ColumnValue) -> bool {
        matches!(
            (self, value),
            (_, ColumnValue::Null)
                | (Self::String, ColumnValue::String(_))
                | (Self::Number, ColumnValue::Number(_))
                | (Self::Boolean, ColumnValue::Boolean(_))
                | (Self::EnumSet, ColumnValue::Set(_))
        )
    }

    /// Stable lowercase label for logs and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::EnumSet => "enum-set",
        }
    }
}

impl core::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value stored in a catalog row.
///
/// Serialized untagged so rows read as plain JSON objects
/// (`{"Map": "Narva", "Size": 12, "Tags": ["night"]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum ColumnValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Numeric value.
    Number(f64),
    /// String value.
    String(String),
    /// Enum-set value.
    Set(BTreeSet<String>),
}

impl ColumnValue {
    /// Whether this is [`ColumnValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the numeric payload, if any.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the boolean payload, if any.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the enum-set payload, if any.
    pub const fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// A comparison operand carried by a filter leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum Scalar {
    /// Matches an absent value.
    Null,
    /// Boolean operand.
    Boolean(bool),
    /// Numeric operand.
    Number(f64),
    /// String operand.
    String(String),
}

impl Scalar {
    /// Whether this operand can be compared against values of `kind`.
    ///
    /// `Null` is accepted for every kind except enum-sets, whose members
    /// are never null.
    pub const fn fits(&self, kind: ValueKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, ValueKind::String | ValueKind::Number | ValueKind::Boolean)
                | (Self::String(_), ValueKind::String | ValueKind::EnumSet)
                | (Self::Number(_), ValueKind::Number)
                | (Self::Boolean(_), ValueKind::Boolean)
        )
    }

    /// Human-readable kind label for error messages.
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
