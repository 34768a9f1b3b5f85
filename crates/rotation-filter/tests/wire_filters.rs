//! Filters arriving in their JSON wire form, validated and evaluated
//! against the base layer schema.

#![allow(clippy::unwrap_used)]

use rotation_columns::{EffectiveColumnSet, ExtensionColumn, base_layer_columns, resolve};
use rotation_filter::{
    FilterEntity, FilterNode, FilterStore, NodePath, ValidationError, evaluate, evaluate_with,
    validate,
};
use rotation_types::{CatalogRow, ColumnValue, ValueKind};
use serde_json::json;

fn columns() -> EffectiveColumnSet {
    resolve(
        &base_layer_columns(),
        &[
            ExtensionColumn::new("Balance", ValueKind::Number),
            ExtensionColumn::new("Tags", ValueKind::EnumSet),
        ],
    )
    .unwrap()
}

fn layer(map: &str, gamemode: &str, balance: f64, tags: &[&str]) -> CatalogRow {
    CatalogRow::new()
        .with("id", format!("{map}-{gamemode}"))
        .with("Map", map)
        .with("Gamemode", gamemode)
        .with("Balance", balance)
        .with(
            "Tags",
            ColumnValue::Set(tags.iter().map(|t| (*t).to_owned()).collect()),
        )
}

fn parse(value: serde_json::Value) -> FilterNode {
    serde_json::from_value(value).unwrap()
}

#[test]
fn ui_tree_validates_and_evaluates() {
    let tree = parse(json!({
        "type": "and",
        "children": [
            { "type": "comp", "comp": { "code": "in", "column": "Gamemode", "values": ["RAAS", "AAS"] } },
            {
                "type": "or",
                "neg": true,
                "children": [
                    { "type": "comp", "comp": { "code": "inrange", "column": "Balance", "range": [null, -5.0] } },
                    { "type": "comp", "comp": { "code": "has", "column": "Tags", "value": "night" } }
                ]
            }
        ]
    }));
    let cols = columns();
    validate(&tree, &cols).unwrap();

    assert!(evaluate(&tree, &layer("Narva", "RAAS", 0.0, &[]), &cols));
    assert!(!evaluate(&tree, &layer("Narva", "Invasion", 0.0, &[]), &cols));
    assert!(!evaluate(&tree, &layer("Narva", "RAAS", -10.0, &[]), &cols));
    assert!(!evaluate(&tree, &layer("Narva", "AAS", 3.0, &["night"]), &cols));
}

#[test]
fn malformed_wire_trees_are_rejected() {
    let comp_with_children = json!({
        "type": "comp",
        "comp": { "code": "eq", "column": "Map", "value": "Narva" },
        "children": []
    });
    let empty_and = json!({ "type": "and", "children": [] });
    let nested_missing_comp = json!({
        "type": "or",
        "children": [{ "type": "and", "children": [{ "type": "comp" }] }]
    });
    for bad in [comp_with_children, empty_and, nested_missing_comp] {
        assert!(serde_json::from_value::<FilterNode>(bad.clone()).is_err(), "{bad}");
    }
}

#[test]
fn unknown_column_names_the_node() {
    let tree = parse(json!({
        "type": "or",
        "children": [
            { "type": "comp", "comp": { "code": "eq", "column": "Map", "value": "Narva" } },
            {
                "type": "and",
                "children": [
                    { "type": "comp", "comp": { "code": "eq", "column": "unknown_col", "value": 1.0 } }
                ]
            }
        ]
    }));
    let err = validate(&tree, &columns()).unwrap_err();
    assert_eq!(err.path(), Some(&NodePath::from(vec![1, 0])));
    assert!(matches!(err, ValidationError::UnknownColumn { ref column, .. } if column == "unknown_col"));
}

#[test]
fn validated_trees_evaluate_on_any_row() {
    let cols = columns();
    let trees = [
        json!({ "type": "comp", "comp": { "code": "neq", "column": "Map", "value": null } }),
        json!({ "type": "comp", "comp": { "code": "notin", "column": "Tags", "values": ["night"] } }),
        json!({ "type": "comp", "comp": { "code": "gt", "column": "Balance", "value": 1.5 } }),
        json!({ "type": "comp", "neg": true, "comp": { "code": "eq", "column": "Gamemode", "value": "RAAS" } }),
    ];
    let rows = [
        CatalogRow::new(),
        CatalogRow::new().with("Map", 5).with("Tags", "night").with("Balance", "high"),
        layer("Narva", "RAAS", 2.0, &["night"]),
    ];
    for tree in trees {
        let tree = parse(tree);
        validate(&tree, &cols).unwrap();
        for row in &rows {
            let _ = evaluate(&tree, row, &cols);
        }
    }
}

#[test]
fn stored_filters_compose() {
    let cols = columns();
    let store = FilterStore::new();
    let raas = parse(json!({
        "type": "and",
        "children": [{ "type": "comp", "comp": { "code": "eq", "column": "Gamemode", "value": "RAAS" } }]
    }));
    store
        .upsert(FilterEntity::new("raas-only", "RAAS only", raas), &cols)
        .unwrap();

    let tree = parse(json!({
        "type": "and",
        "children": [
            { "type": "apply-filter", "filterId": "raas-only" },
            { "type": "comp", "comp": { "code": "eq", "column": "Map", "value": "Narva" } }
        ]
    }));
    rotation_filter::validate_with(&tree, &cols, &store).unwrap();
    assert!(evaluate_with(&tree, &layer("Narva", "RAAS", 0.0, &[]), &cols, &store));
    assert!(!evaluate_with(&tree, &layer("Narva", "AAS", 0.0, &[]), &cols, &store));
    assert!(matches!(
        validate(&tree, &cols),
        Err(ValidationError::UnknownFilter { .. })
    ));
}
