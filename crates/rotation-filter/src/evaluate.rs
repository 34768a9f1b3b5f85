//! Evaluation of filter trees against catalog rows.

use rotation_columns::EffectiveColumnSet;
use rotation_types::{ColumnValue, RowValues};

use crate::node::{BlockOp, FilterNode};
use crate::validate::{FilterResolver, NoFilters};

/// Evaluate `tree` against `row`.
///
/// Evaluation never fails. A comparison against a column missing from
/// `columns`, or against a stored value of the wrong kind, does not
/// match. A column absent from the row is treated as `null`. Blocks
/// short-circuit in child declaration order; negation is applied to a
/// node's result after its own evaluation.
///
/// Negation also flips those fallbacks: a negated comparison on an
/// unknown column or a wrongly typed value matches. Trees that passed
/// [`validate`](crate::validate()) never reach that case, so only
/// validated trees should be evaluated.
///
/// `apply-filter` nodes never match here; use [`evaluate_with`] to
/// inline stored filters.
pub fn evaluate<R: RowValues + ?Sized>(
    tree: &FilterNode,
    row: &R,
    columns: &EffectiveColumnSet,
) -> bool {
    evaluate_with(tree, row, columns, &NoFilters)
}

/// Evaluate `tree` against `row`, inlining stored filters from `filters`.
///
/// An unresolvable or recursive reference does not match.
pub fn evaluate_with<R: RowValues + ?Sized>(
    tree: &FilterNode,
    row: &R,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
) -> bool {
    let mut stack = Vec::new();
    eval_node(tree, row, columns, filters, &mut stack)
}

fn eval_node<R: RowValues + ?Sized>(
    node: &FilterNode,
    row: &R,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
    stack: &mut Vec<String>,
) -> bool {
    let result = match node {
        FilterNode::Comp { comp, .. } => match columns.get(comp.column()) {
            Some(def) => {
                let value = row.value(comp.column()).unwrap_or(&ColumnValue::Null);
                def.admits(value) && comp.matches(value)
            }
            None => false,
        },
        FilterNode::Block(block) => {
            let mut children = block.children().iter();
            match block.op() {
                BlockOp::And => {
                    children.all(|child| eval_node(child, row, columns, filters, stack))
                }
                BlockOp::Or => children.any(|child| eval_node(child, row, columns, filters, stack)),
            }
        }
        FilterNode::ApplyFilter { filter_id, .. } => {
            if stack.iter().any(|id| id == filter_id) {
                tracing::debug!(filter_id = %filter_id, "Recursive filter reference does not match");
                false
            } else if let Some(referenced) = filters.resolve_filter(filter_id) {
                stack.push(filter_id.clone());
                let matched = eval_node(&referenced, row, columns, filters, stack);
                stack.pop();
                matched
            } else {
                false
            }
        }
    };
    result != node.is_negated()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Arc;

    use rotation_columns::{ExtensionColumn, resolve};
    use rotation_types::{CatalogRow, ColumnDefinition, ColumnSource, Scalar, ValueKind};

    use super::*;
    use crate::comparison::Comparison;
    use crate::validate::validate;

    /// Base `{name, size}` plus the `region` extension.
    fn columns() -> EffectiveColumnSet {
        resolve(
            &[
                ColumnDefinition::base("name", ValueKind::String),
                ColumnDefinition::base("size", ValueKind::Number),
            ],
            &[ExtensionColumn::new("region", ValueKind::String)],
        )
        .unwrap()
    }

    fn eq(column: &str, value: impl Into<Scalar>) -> FilterNode {
        FilterNode::comp(Comparison::Eq {
            column: column.to_owned(),
            value: value.into(),
        })
    }

    fn gt(column: &str, value: f64) -> FilterNode {
        FilterNode::comp(Comparison::Gt {
            column: column.to_owned(),
            value,
        })
    }

    fn row(name: &str, size: f64, region: &str) -> CatalogRow {
        CatalogRow::new()
            .with("name", name)
            .with("size", size)
            .with("region", region)
    }

    #[test]
    fn extension_column_example() {
        let cols = columns();
        assert_eq!(cols.names().collect::<Vec<_>>(), vec!["name", "size", "region"]);
        assert_eq!(cols.get("region").unwrap().source, ColumnSource::Extension);

        let tree = FilterNode::and(vec![eq("name", "Foo"), gt("size", 10.0)]).unwrap();
        validate(&tree, &cols).unwrap();

        let full = CatalogRow::new()
            .with("name", "Foo")
            .with("size", 12.0)
            .with("region", "eu");
        assert!(evaluate(&tree, &full, &cols));

        let without_region = CatalogRow::new().with("name", "Foo").with("size", 5.0);
        assert!(!evaluate(&tree, &without_region, &cols));
    }

    #[test]
    fn and_of_or() {
        let tree = FilterNode::and(vec![
            eq("name", "Foo"),
            FilterNode::or(vec![gt("size", 10.0), eq("region", "EU")]).unwrap(),
        ])
        .unwrap();
        let cols = columns();
        assert!(evaluate(&tree, &row("Foo", 5.0, "EU"), &cols));
        assert!(!evaluate(&tree, &row("Foo", 5.0, "US"), &cols));
        assert!(evaluate(&tree, &row("Foo", 20.0, "US"), &cols));
        assert!(!evaluate(&tree, &row("Bar", 20.0, "EU"), &cols));
    }

    #[test]
    fn negation_applies_after_evaluation() {
        let cols = columns();
        let tree = eq("name", "Foo").negate();
        assert!(!evaluate(&tree, &row("Foo", 1.0, "EU"), &cols));
        assert!(evaluate(&tree, &row("Bar", 1.0, "EU"), &cols));

        let block = FilterNode::or(vec![eq("name", "Foo"), eq("region", "EU")])
            .unwrap()
            .negate();
        assert!(evaluate(&block, &row("Bar", 1.0, "US"), &cols));
    }

    #[test]
    fn unknown_column_and_wrong_kind_do_not_match() {
        let cols = columns();
        assert!(!evaluate(&eq("unknown_col", "x"), &row("Foo", 1.0, "EU"), &cols));

        let odd = CatalogRow::new().with("size", "large");
        assert!(!evaluate(&gt("size", 1.0), &odd, &cols));
    }

    #[test]
    fn negated_fallback_matches_but_fails_validation() {
        let cols = columns();
        let unknown = FilterNode::and(vec![eq("unknown_col", "x").negate()]).unwrap();
        assert!(evaluate(&unknown, &row("Foo", 1.0, "EU"), &cols));
        assert!(validate(&unknown, &cols).is_err());

        let odd = CatalogRow::new().with("size", "large");
        assert!(evaluate(&gt("size", 1.0).negate(), &odd, &cols));
    }

    #[test]
    fn missing_row_value_is_null() {
        let cols = columns();
        let empty = CatalogRow::new();
        assert!(evaluate(&eq("name", Scalar::Null), &empty, &cols));
        assert!(!evaluate(&eq("name", "Foo"), &empty, &cols));
    }

    /// Row that records the order in which columns are read.
    struct Recording {
        inner: CatalogRow,
        reads: RefCell<Vec<String>>,
    }

    impl RowValues for Recording {
        fn value(&self, column: &str) -> Option<&ColumnValue> {
            self.reads.borrow_mut().push(column.to_owned());
            self.inner.value(column)
        }
    }

    #[test]
    fn short_circuits_in_declaration_order() {
        let cols = columns();
        let recording = Recording {
            inner: row("Bar", 1.0, "EU"),
            reads: RefCell::new(Vec::new()),
        };
        let and = FilterNode::and(vec![eq("name", "Foo"), eq("region", "EU")]).unwrap();
        assert!(!evaluate(&and, &recording, &cols));
        assert_eq!(*recording.reads.borrow(), vec![String::from("name")]);

        recording.reads.borrow_mut().clear();
        let or = FilterNode::or(vec![eq("region", "EU"), eq("name", "Foo")]).unwrap();
        assert!(evaluate(&or, &recording, &cols));
        assert_eq!(*recording.reads.borrow(), vec![String::from("region")]);
    }

    struct Filters(HashMap<String, Arc<FilterNode>>);

    impl FilterResolver for Filters {
        fn resolve_filter(&self, id: &str) -> Option<Arc<FilterNode>> {
            self.0.get(id).cloned()
        }
    }

    #[test]
    fn stored_filters_are_inlined() {
        let cols = columns();
        let mut stored = HashMap::new();
        stored.insert(
            String::from("eu-only"),
            Arc::new(FilterNode::and(vec![eq("region", "EU")]).unwrap()),
        );
        let filters = Filters(stored);

        let tree = FilterNode::and(vec![FilterNode::apply_filter("eu-only")]).unwrap();
        assert!(evaluate_with(&tree, &row("Foo", 1.0, "EU"), &cols, &filters));
        assert!(!evaluate_with(&tree, &row("Foo", 1.0, "US"), &cols, &filters));

        let negated = FilterNode::apply_filter("eu-only").negate();
        assert!(evaluate_with(&negated, &row("Foo", 1.0, "US"), &cols, &filters));

        assert!(!evaluate(&tree, &row("Foo", 1.0, "EU"), &cols));
    }

    #[test]
    fn recursive_reference_does_not_match() {
        let cols = columns();
        let mut stored = HashMap::new();
        stored.insert(
            String::from("loop"),
            Arc::new(FilterNode::or(vec![FilterNode::apply_filter("loop")]).unwrap()),
        );
        let tree = FilterNode::apply_filter("loop");
        assert!(!evaluate_with(&tree, &row("Foo", 1.0, "EU"), &cols, &Filters(stored)));
    }
}
