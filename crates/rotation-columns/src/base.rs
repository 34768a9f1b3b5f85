//! The fixed base columns of the layer catalog.

use rotation_types::{ColumnDefinition, ValueKind};

/// Columns offered as grouping keys in layer component pickers.
pub const GROUP_BY_COLUMNS: [&str; 11] = [
    "Map",
    "Layer",
    "Size",
    "Faction_1",
    "Faction_2",
    "Unit_1",
    "Unit_2",
    "Alliance_1",
    "Alliance_2",
    "Gamemode",
    "LayerVersion",
];

/// The base layer schema, in declaration order.
pub fn base_layer_columns() -> Vec<ColumnDefinition> {
    let string = |name: &str, display: &str| {
        ColumnDefinition::base(name, ValueKind::String).with_display_name(display)
    };
    vec![
        string("id", "ID").not_null(),
        string("Map", "Map").not_null(),
        string("Layer", "Layer").not_null(),
        string("Size", "Size").not_null(),
        string("Gamemode", "Gamemode").not_null(),
        string("LayerVersion", "Version"),
        string("Faction_1", "T1").not_null(),
        string("Faction_2", "T2").not_null(),
        string("Unit_1", "Unit T1").not_null(),
        string("Unit_2", "Unit T2").not_null(),
        string("Alliance_1", "Alliance T1").not_null(),
        string("Alliance_2", "Alliance T2").not_null(),
    ]
}
