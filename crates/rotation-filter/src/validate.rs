//! Validation of filter trees against an effective column set.
//!
//! Validation walks the tree depth-first in child declaration order and
//! stops at the first violation, reporting the offending node's path.
//! Named filters are expanded through a [`FilterResolver`] so their
//! comparisons are checked against the same column set, and cycles of
//! filters referencing each other are rejected.

use std::sync::Arc;

use rotation_columns::EffectiveColumnSet;
use rotation_types::Scalar;

use crate::comparison::Comparison;
use crate::error::{MalformedReason, NodePath, ValidationError};
use crate::node::FilterNode;

/// Lookup of stored filters by ID.
pub trait FilterResolver {
    /// Return the tree of the stored filter `id`, if it exists.
    fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>>;
}

/// A resolver that knows no stored filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilters;

impl FilterResolver for NoFilters {
    fn resolve_filter(&self, _id: &str) -> Option<Arc<FilterNode>> {
        None
    }
}

impl<R: FilterResolver + ?Sized> FilterResolver for &R {
    fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>> {
        (**self).resolve_filter(id)
    }
}

impl<R: FilterResolver + ?Sized> FilterResolver for Arc<R> {
    fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>> {
        (**self).resolve_filter(id)
    }
}

/// Validate a tree that must not reference stored filters.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(tree: &FilterNode, columns: &EffectiveColumnSet) -> Result<(), ValidationError> {
    validate_with(tree, columns, &NoFilters)
}

/// Validate a tree, resolving `apply-filter` references through `filters`.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_with(
    tree: &FilterNode,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
) -> Result<(), ValidationError> {
    let mut walker = Walker {
        columns,
        filters,
        path: NodePath::root(),
        chain: Vec::new(),
    };
    walker.node(tree)
}

/// Validate a tree that is stored as a named filter: its root must be an
/// `and`/`or` block.
///
/// # Errors
///
/// Returns [`ValidationError::RootNotBlock`] or the first violation found
/// inside the tree.
pub fn validate_root(
    tree: &FilterNode,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
) -> Result<(), ValidationError> {
    if !tree.is_block() {
        return Err(ValidationError::RootNotBlock);
    }
    validate_with(tree, columns, filters)
}

struct Walker<'a> {
    columns: &'a EffectiveColumnSet,
    filters: &'a dyn FilterResolver,
    path: NodePath,
    chain: Vec<String>,
}

impl Walker<'_> {
    fn node(&mut self, node: &FilterNode) -> Result<(), ValidationError> {
        match node {
            FilterNode::Comp { comp, .. } => self.comparison(comp),
            FilterNode::Block(block) => {
                if block.children().is_empty() {
                    return Err(ValidationError::Malformed {
                        path: self.path.clone(),
                        reason: MalformedReason::EmptyBranch,
                    });
                }
                for (i, child) in block.children().iter().enumerate() {
                    self.path.push(i);
                    let result = self.node(child);
                    self.path.pop();
                    result?;
                }
                Ok(())
            }
            FilterNode::ApplyFilter { filter_id, .. } => self.apply_filter(filter_id),
        }
    }

    fn apply_filter(&mut self, filter_id: &str) -> Result<(), ValidationError> {
        if self.chain.iter().any(|id| id == filter_id) {
            let mut chain = self.chain.clone();
            chain.push(filter_id.to_owned());
            return Err(ValidationError::RecursiveFilter {
                path: self.path.clone(),
                chain,
            });
        }
        let Some(referenced) = self.filters.resolve_filter(filter_id) else {
            return Err(ValidationError::UnknownFilter {
                path: self.path.clone(),
                filter_id: filter_id.to_owned(),
            });
        };

        // Paths inside the referenced filter are relative to its own root.
        // Recursion is reported at the outermost referencing node.
        self.chain.push(filter_id.to_owned());
        let saved = std::mem::take(&mut self.path);
        let result = self.node(&referenced);
        self.path = saved;
        self.chain.pop();

        result.map_err(|e| match e {
            ValidationError::RecursiveFilter { chain, .. } => ValidationError::RecursiveFilter {
                path: self.path.clone(),
                chain,
            },
            other => other,
        })
    }

    fn comparison(&self, comp: &Comparison) -> Result<(), ValidationError> {
        let column = comp.column();
        let Some(def) = self.columns.get(column) else {
            return Err(ValidationError::UnknownColumn {
                path: self.path.clone(),
                column: column.to_owned(),
            });
        };
        let kind = def.value_kind;
        let operator = comp.operator();
        if !operator.is_legal_for(kind) {
            return Err(ValidationError::OperatorNotAllowed {
                path: self.path.clone(),
                column: column.to_owned(),
                operator,
                kind,
            });
        }

        let mismatch = |found: &'static str| ValidationError::OperandMismatch {
            path: self.path.clone(),
            column: column.to_owned(),
            operator,
            expected: kind,
            found,
        };
        let check_scalar = |operand: &Scalar| -> Result<(), ValidationError> {
            if !operand.fits(kind) {
                return Err(mismatch(operand.kind_label()));
            }
            if let Scalar::Number(n) = operand {
                if !n.is_finite() {
                    return Err(ValidationError::NonFiniteOperand {
                        path: self.path.clone(),
                        column: column.to_owned(),
                    });
                }
            }
            if let Scalar::String(s) = operand {
                if !def.allows(s) {
                    return Err(ValidationError::ValueNotAllowed {
                        path: self.path.clone(),
                        column: column.to_owned(),
                        value: s.clone(),
                    });
                }
            }
            Ok(())
        };

        match comp {
            Comparison::Eq { value, .. } | Comparison::Neq { value, .. } => check_scalar(value),
            Comparison::In { values, .. } | Comparison::NotIn { values, .. } => {
                values.iter().try_for_each(&check_scalar)
            }
            Comparison::Lt { value, .. } | Comparison::Gt { value, .. } => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(ValidationError::NonFiniteOperand {
                        path: self.path.clone(),
                        column: column.to_owned(),
                    })
                }
            }
            Comparison::InRange { range, .. } => {
                let (start, end) = *range;
                let finite = |b: Option<f64>| b.is_none_or(f64::is_finite);
                if (start.is_none() && end.is_none()) || !finite(start) || !finite(end) {
                    Err(ValidationError::InvalidRange {
                        path: self.path.clone(),
                        column: column.to_owned(),
                    })
                } else {
                    Ok(())
                }
            }
            Comparison::IsTrue { .. } => Ok(()),
            Comparison::Has { value, .. } => {
                if def.allows(value) {
                    Ok(())
                } else {
                    Err(ValidationError::ValueNotAllowed {
                        path: self.path.clone(),
                        column: column.to_owned(),
                        value: value.clone(),
                    })
                }
            }
        }
    }
}
