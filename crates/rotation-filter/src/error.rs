//! Validation errors and node paths.

use rotation_types::ValueKind;

use crate::comparison::Operator;

/// Position of a node inside a filter tree, as child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The root path.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Child indices from the root.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Path of the `index`-th child of this node.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl core::fmt::Display for NodePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("root")?;
        for index in &self.0 {
            write!(f, ".{index}")?;
        }
        Ok(())
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// Structural defects detected while constructing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A `comp` node without a `comp` payload.
    MissingComparison,
    /// A `comp` node carrying children.
    ComparisonWithChildren,
    /// An `and`/`or` node without a `children` list.
    MissingChildren,
    /// An `and`/`or` node with an empty `children` list.
    EmptyBranch,
    /// An `and`/`or` node carrying a `comp` payload.
    BlockWithComparison,
    /// An `apply-filter` node without a filter ID.
    MissingFilterId,
    /// An `apply-filter` node carrying a comparison or children.
    ApplyFilterWithPayload,
    /// A filter ID on a node that is not `apply-filter`.
    StrayFilterId,
}

impl core::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::MissingComparison => "comp must be defined for type \"comp\"",
            Self::ComparisonWithChildren => "children must not be defined for type \"comp\"",
            Self::MissingChildren => "children must be defined for type \"and\" or \"or\"",
            Self::EmptyBranch => "\"and\"/\"or\" must have at least one child",
            Self::BlockWithComparison => "comp must not be defined for type \"and\" or \"or\"",
            Self::MissingFilterId => "filterId must be defined for type \"apply-filter\"",
            Self::ApplyFilterWithPayload => {
                "comp and children must not be defined for type \"apply-filter\""
            }
            Self::StrayFilterId => "filterId is only allowed for type \"apply-filter\"",
        })
    }
}

/// Reasons a filter tree is rejected.
///
/// Every variant except [`RootNotBlock`](Self::RootNotBlock) reports the
/// path of the first offending node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The tree's shape violates the node invariants.
    #[error("malformed node at {path}: {reason}")]
    Malformed {
        /// Offending node.
        path: NodePath,
        /// What is wrong.
        reason: MalformedReason,
    },

    /// A comparison references a column absent from the column set.
    #[error("unknown column `{column}` at {path}")]
    UnknownColumn {
        /// Offending node.
        path: NodePath,
        /// The missing column name.
        column: String,
    },

    /// The operator cannot be applied to the column's kind.
    #[error("operator `{operator}` is not valid for {kind} column `{column}` at {path}")]
    OperatorNotAllowed {
        /// Offending node.
        path: NodePath,
        /// The column compared.
        column: String,
        /// The operator used.
        operator: Operator,
        /// The column's declared kind.
        kind: ValueKind,
    },

    /// An operand's type does not match the column kind.
    #[error("operand for `{operator}` on {expected} column `{column}` at {path} is {found}")]
    OperandMismatch {
        /// Offending node.
        path: NodePath,
        /// The column compared.
        column: String,
        /// The operator used.
        operator: Operator,
        /// The column's declared kind.
        expected: ValueKind,
        /// The operand's actual kind.
        found: &'static str,
    },

    /// An operand is outside the column's enumeration.
    #[error("value `{value}` is not an allowed value of column `{column}` at {path}")]
    ValueNotAllowed {
        /// Offending node.
        path: NodePath,
        /// The column compared.
        column: String,
        /// The rejected value.
        value: String,
    },

    /// An `inrange` comparison with neither bound, or a non-finite bound.
    #[error("range on column `{column}` at {path} needs at least one finite bound")]
    InvalidRange {
        /// Offending node.
        path: NodePath,
        /// The column compared.
        column: String,
    },

    /// A numeric operand is NaN or infinite.
    #[error("numeric operand on column `{column}` at {path} is not finite")]
    NonFiniteOperand {
        /// Offending node.
        path: NodePath,
        /// The column compared.
        column: String,
    },

    /// An `apply-filter` node references a filter that does not exist.
    #[error("filter `{filter_id}` referenced at {path} does not exist")]
    UnknownFilter {
        /// Offending node.
        path: NodePath,
        /// The missing filter ID.
        filter_id: String,
    },

    /// Named filters reference each other in a cycle.
    #[error("filter is mutually recursive via {} at {path}", chain.join(" -> "))]
    RecursiveFilter {
        /// Offending node.
        path: NodePath,
        /// Filter IDs forming the cycle, ending with the repeated one.
        chain: Vec<String>,
    },

    /// A stored filter's root is not an `and`/`or` block.
    #[error("root node must be an \"and\" or \"or\" block")]
    RootNotBlock,
}

impl ValidationError {
    /// Path of the offending node, if the error is tied to one.
    pub const fn path(&self) -> Option<&NodePath> {
        match self {
            Self::Malformed { path, .. }
            | Self::UnknownColumn { path, .. }
            | Self::OperatorNotAllowed { path, .. }
            | Self::OperandMismatch { path, .. }
            | Self::ValueNotAllowed { path, .. }
            | Self::InvalidRange { path, .. }
            | Self::NonFiniteOperand { path, .. }
            | Self::UnknownFilter { path, .. }
            | Self::RecursiveFilter { path, .. } => Some(path),
            Self::RootNotBlock => None,
        }
    }

    /// Whether this is an [`UnknownColumn`](Self::UnknownColumn) error.
    pub const fn is_unknown_column(&self) -> bool {
        matches!(self, Self::UnknownColumn { .. })
    }

    /// Prefix a malformed-node path with the child `index` it was found
    /// under, as subtrees are built before their parent.
    #[must_use]
    pub(crate) fn nested_under(mut self, index: usize) -> Self {
        if let Self::Malformed { path, .. } = &mut self {
            path.0.insert(0, index);
        }
        self
    }
}
