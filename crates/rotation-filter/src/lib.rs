//! Filter expressions over the layer catalog.
//!
//! A filter is a recursive boolean tree: `comp` leaves compare one column
//! against an operand, `and`/`or` blocks combine children, and
//! `apply-filter` leaves inline a stored, named filter. Every node may be
//! negated.
//!
//! Trees are checked in two stages:
//!
//! 1. **Construction** -- deserializing the JSON wire form (or calling the
//!    [`FilterNode`] constructors) rejects malformed shapes such as a
//!    `comp` node with children or an empty `and` block.
//! 2. **Validation** -- [`validate`] checks a tree against an
//!    [`EffectiveColumnSet`](rotation_columns::EffectiveColumnSet):
//!    columns exist, operators suit the column kind, operands have the
//!    right type, and named filters resolve without recursion.
//!
//! [`evaluate`] never fails: once a tree has been validated against a
//! column set it is a complete gate, and anything unexpected at
//! evaluation time simply does not match.

pub mod comparison;
pub mod entity;
pub mod error;
pub mod evaluate;
pub mod node;
pub mod validate;

pub use comparison::{Comparison, Operator};
pub use entity::{FilterEntity, FilterStore, FilterStoreError};
pub use error::{MalformedReason, NodePath, ValidationError};
pub use evaluate::{evaluate, evaluate_with};
pub use node::{BlockNode, BlockOp, FilterNode, NodeType, RawFilterNode};
pub use validate::{FilterResolver, NoFilters, validate, validate_root, validate_with};
