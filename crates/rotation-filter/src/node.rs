//! The filter tree and its JSON wire form.
//!
//! [`FilterNode`] is the validated-by-construction tree: a `comp` node
//! always has a comparison and never children, and an `and`/`or` block
//! always has at least one child. [`RawFilterNode`] is the loosely shaped
//! wire form sent by operator UIs; converting it (which is what
//! deserializing a [`FilterNode`] does) rejects every shape violation
//! instead of coercing it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::comparison::Comparison;
use crate::error::{MalformedReason, NodePath, ValidationError};

/// Node type discriminant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum NodeType {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
    /// Column comparison leaf.
    Comp,
    /// Reference to a stored, named filter.
    ApplyFilter,
}

/// Wire form of a filter node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RawFilterNode {
    /// Node discriminant.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Invert the node's result.
    #[serde(default)]
    pub neg: bool,
    /// Comparison payload (`comp` nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp: Option<Comparison>,
    /// Children (`and`/`or` nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawFilterNode>>,
    /// Referenced filter (`apply-filter` nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,
}

/// Boolean combinator of a block node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

/// An `and`/`or` node with a guaranteed non-empty child list.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    op: BlockOp,
    neg: bool,
    children: Vec<FilterNode>,
}

impl BlockNode {
    /// Create a block.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] with
    /// [`MalformedReason::EmptyBranch`] if `children` is empty.
    pub fn new(op: BlockOp, children: Vec<FilterNode>) -> Result<Self, ValidationError> {
        if children.is_empty() {
            return Err(ValidationError::Malformed {
                path: NodePath::root(),
                reason: MalformedReason::EmptyBranch,
            });
        }
        Ok(Self {
            op,
            neg: false,
            children,
        })
    }

    /// The block's combinator.
    pub const fn op(&self) -> BlockOp {
        self.op
    }

    /// Whether the block's result is inverted.
    pub const fn neg(&self) -> bool {
        self.neg
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }
}

/// A validated-by-construction filter tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilterNode", into = "RawFilterNode")]
pub enum FilterNode {
    /// Column comparison leaf.
    Comp {
        /// The comparison.
        comp: Comparison,
        /// Invert the result.
        neg: bool,
    },
    /// `and`/`or` block.
    Block(BlockNode),
    /// Reference to a stored, named filter.
    ApplyFilter {
        /// ID of the referenced filter.
        filter_id: String,
        /// Invert the result.
        neg: bool,
    },
}

impl FilterNode {
    /// A comparison leaf.
    pub const fn comp(comp: Comparison) -> Self {
        Self::Comp { comp, neg: false }
    }

    /// An `and` block.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] if `children` is empty.
    pub fn and(children: Vec<Self>) -> Result<Self, ValidationError> {
        BlockNode::new(BlockOp::And, children).map(Self::Block)
    }

    /// An `or` block.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] if `children` is empty.
    pub fn or(children: Vec<Self>) -> Result<Self, ValidationError> {
        BlockNode::new(BlockOp::Or, children).map(Self::Block)
    }

    /// A reference to a stored filter.
    pub fn apply_filter(filter_id: impl Into<String>) -> Self {
        Self::ApplyFilter {
            filter_id: filter_id.into(),
            neg: false,
        }
    }

    /// Invert this node's result.
    #[must_use]
    pub fn negate(self) -> Self {
        let flipped = !self.is_negated();
        self.with_neg(flipped)
    }

    /// Set the negation flag.
    #[must_use]
    pub fn with_neg(mut self, value: bool) -> Self {
        match &mut self {
            Self::Comp { neg, .. } | Self::ApplyFilter { neg, .. } => *neg = value,
            Self::Block(block) => block.neg = value,
        }
        self
    }

    /// Whether this node's result is inverted.
    pub const fn is_negated(&self) -> bool {
        match self {
            Self::Comp { neg, .. } | Self::ApplyFilter { neg, .. } => *neg,
            Self::Block(block) => block.neg,
        }
    }

    /// The node's wire discriminant.
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Comp { .. } => NodeType::Comp,
            Self::Block(block) => match block.op {
                BlockOp::And => NodeType::And,
                BlockOp::Or => NodeType::Or,
            },
            Self::ApplyFilter { .. } => NodeType::ApplyFilter,
        }
    }

    /// Whether this node is an `and`/`or` block.
    pub const fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    /// Whether this tree references the named filter `id` anywhere.
    ///
    /// Only direct references are reported; references hidden behind
    /// other named filters are not expanded.
    pub fn contains_filter_id(&self, id: &str) -> bool {
        match self {
            Self::Comp { .. } => false,
            Self::ApplyFilter { filter_id, .. } => filter_id == id,
            Self::Block(block) => block.children.iter().any(|c| c.contains_filter_id(id)),
        }
    }

    /// Count of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Comp { .. } | Self::ApplyFilter { .. } => 1,
            Self::Block(block) => block
                .children
                .iter()
                .map(Self::node_count)
                .fold(1_usize, usize::saturating_add),
        }
    }
}

impl TryFrom<RawFilterNode> for FilterNode {
    type Error = ValidationError;

    fn try_from(raw: RawFilterNode) -> Result<Self, Self::Error> {
        let malformed = |reason| ValidationError::Malformed {
            path: NodePath::root(),
            reason,
        };
        match raw.node_type {
            NodeType::Comp => {
                if raw.children.is_some() {
                    return Err(malformed(MalformedReason::ComparisonWithChildren));
                }
                if raw.filter_id.is_some() {
                    return Err(malformed(MalformedReason::StrayFilterId));
                }
                let comp = raw
                    .comp
                    .ok_or_else(|| malformed(MalformedReason::MissingComparison))?;
                Ok(Self::Comp { comp, neg: raw.neg })
            }
            NodeType::And | NodeType::Or => {
                if raw.comp.is_some() {
                    return Err(malformed(MalformedReason::BlockWithComparison));
                }
                if raw.filter_id.is_some() {
                    return Err(malformed(MalformedReason::StrayFilterId));
                }
                let raw_children = raw
                    .children
                    .ok_or_else(|| malformed(MalformedReason::MissingChildren))?;
                let children = raw_children
                    .into_iter()
                    .enumerate()
                    .map(|(i, child)| Self::try_from(child).map_err(|e| e.nested_under(i)))
                    .collect::<Result<Vec<_>, _>>()?;
                let op = if raw.node_type == NodeType::And {
                    BlockOp::And
                } else {
                    BlockOp::Or
                };
                let block = BlockNode::new(op, children)?;
                Ok(Self::Block(BlockNode {
                    neg: raw.neg,
                    ..block
                }))
            }
            NodeType::ApplyFilter => {
                if raw.comp.is_some() || raw.children.is_some() {
                    return Err(malformed(MalformedReason::ApplyFilterWithPayload));
                }
                match raw.filter_id {
                    Some(filter_id) if !filter_id.trim().is_empty() => Ok(Self::ApplyFilter {
                        filter_id,
                        neg: raw.neg,
                    }),
                    _ => Err(malformed(MalformedReason::MissingFilterId)),
                }
            }
        }
    }
}

impl From<FilterNode> for RawFilterNode {
    fn from(node: FilterNode) -> Self {
        let node_type = node.node_type();
        match node {
            FilterNode::Comp { comp, neg } => Self {
                node_type,
                neg,
                comp: Some(comp),
                children: None,
                filter_id: None,
            },
            FilterNode::Block(block) => Self {
                node_type,
                neg: block.neg,
                comp: None,
                children: Some(block.children.into_iter().map(Self::from).collect()),
                filter_id: None,
            },
            FilterNode::ApplyFilter { filter_id, neg } => Self {
                node_type,
                neg,
                comp: None,
                children: None,
                filter_id: Some(filter_id),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rotation_types::Scalar;

    use super::*;

    fn eq(column: &str, value: &str) -> FilterNode {
        FilterNode::comp(Comparison::Eq {
            column: column.to_owned(),
            value: Scalar::from(value),
        })
    }

    #[test]
    fn deserializes_nested_tree() {
        let json = r#"{
            "type": "and",
            "children": [
                {"type": "comp", "comp": {"code": "eq", "column": "Map", "value": "Narva"}},
                {"type": "or", "neg": true, "children": [
                    {"type": "apply-filter", "filterId": "no-invasion"}
                ]}
            ]
        }"#;
        let node: FilterNode = serde_json::from_str(json).unwrap();
        let FilterNode::Block(root) = &node else {
            panic!("expected block");
        };
        assert_eq!(root.op(), BlockOp::And);
        assert_eq!(root.children().len(), 2);
        assert!(root.children().get(1).unwrap().is_negated());
        assert!(node.contains_filter_id("no-invasion"));
        assert_eq!(node.node_count(), 4);
    }

    #[test]
    fn comp_with_children_is_rejected() {
        let json = r#"{"type": "comp", "comp": {"code": "eq", "column": "Map", "value": "x"}, "children": []}"#;
        let err = serde_json::from_str::<FilterNode>(json).unwrap_err();
        assert!(err.to_string().contains("children must not be defined"));
    }

    #[test]
    fn empty_branch_is_rejected_with_path() {
        let raw: RawFilterNode = serde_json::from_str(
            r#"{"type": "and", "children": [
                {"type": "comp", "comp": {"code": "eq", "column": "Map", "value": "x"}},
                {"type": "or", "children": []}
            ]}"#,
        )
        .unwrap();
        let err = FilterNode::try_from(raw).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                path: NodePath::from(vec![1]),
                reason: MalformedReason::EmptyBranch,
            }
        );
    }

    #[test]
    fn block_without_children_is_rejected() {
        let raw: RawFilterNode = serde_json::from_str(r#"{"type": "or"}"#).unwrap();
        assert!(matches!(
            FilterNode::try_from(raw),
            Err(ValidationError::Malformed {
                reason: MalformedReason::MissingChildren,
                ..
            })
        ));
    }

    #[test]
    fn block_with_comparison_is_rejected() {
        let raw: RawFilterNode = serde_json::from_str(
            r#"{"type": "and", "comp": {"code": "eq", "column": "Map", "value": "x"}, "children": []}"#,
        )
        .unwrap();
        assert!(matches!(
            FilterNode::try_from(raw),
            Err(ValidationError::Malformed {
                reason: MalformedReason::BlockWithComparison,
                ..
            })
        ));
    }

    #[test]
    fn comp_without_payload_is_rejected() {
        let raw: RawFilterNode = serde_json::from_str(r#"{"type": "comp"}"#).unwrap();
        assert!(matches!(
            FilterNode::try_from(raw),
            Err(ValidationError::Malformed {
                reason: MalformedReason::MissingComparison,
                ..
            })
        ));
    }

    #[test]
    fn constructors_reject_empty_blocks() {
        assert!(FilterNode::and(Vec::new()).is_err());
        assert!(FilterNode::or(vec![eq("Map", "Narva")]).is_ok());
    }

    #[test]
    fn serializes_back_to_wire_shape() {
        let node = FilterNode::and(vec![eq("Map", "Narva").negate()]).unwrap();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "and",
                "neg": false,
                "children": [{
                    "type": "comp",
                    "neg": true,
                    "comp": {"code": "eq", "column": "Map", "value": "Narva"}
                }]
            })
        );
    }
}
