//! Sorting and paging of result lists.

use std::cmp::Ordering;

use rotation_types::{ColumnValue, RowValues};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "bindings/")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Sort of a result list by one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Sort {
    /// Column to sort by.
    pub column: String,
    /// Direction; nulls sort last either way.
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sort {
    /// Sort rows in place. The sort is stable.
    pub fn apply<R: RowValues>(&self, rows: &mut [&R]) {
        rows.sort_by(|a, b| {
            compare(
                a.value(&self.column).unwrap_or(&ColumnValue::Null),
                b.value(&self.column).unwrap_or(&ColumnValue::Null),
                self.direction,
            )
        });
    }
}

/// Compare two values, placing nulls last regardless of direction.
///
/// Values of different kinds order by kind so the comparison stays total.
pub fn compare(a: &ColumnValue, b: &ColumnValue, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ordering = match (a, b) {
        (ColumnValue::Boolean(x), ColumnValue::Boolean(y)) => x.cmp(y),
        (ColumnValue::Number(x), ColumnValue::Number(y)) => x.total_cmp(y),
        (ColumnValue::String(x), ColumnValue::String(y)) => x.cmp(y),
        (ColumnValue::Set(x), ColumnValue::Set(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

const fn rank(value: &ColumnValue) -> u8 {
    match value {
        ColumnValue::Boolean(_) => 0,
        ColumnValue::Number(_) => 1,
        ColumnValue::String(_) => 2,
        ColumnValue::Set(_) => 3,
        ColumnValue::Null => 4,
    }
}

/// A page of a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Page {
    /// Items per page; must be at least 1 to return anything.
    pub page_size: usize,
    /// Zero-based page number.
    #[serde(default)]
    pub page_index: usize,
}

impl Page {
    /// Keep only this page of `items`.
    pub fn apply<T>(self, items: &mut Vec<T>) {
        let start = self.page_index.saturating_mul(self.page_size);
        if start >= items.len() {
            items.clear();
            return;
        }
        items.drain(..start);
        items.truncate(self.page_size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rotation_types::CatalogRow;

    use super::*;

    #[test]
    fn nulls_sort_last_both_ways() {
        let rows = [
            CatalogRow::new().with("Size", "Large").with("n", 1),
            CatalogRow::new().with("n", 2),
            CatalogRow::new().with("Size", "Small").with("n", 3),
        ];
        let order = |direction| {
            let mut refs: Vec<&CatalogRow> = rows.iter().collect();
            Sort {
                column: String::from("Size"),
                direction,
            }
            .apply(&mut refs);
            refs.iter()
                .map(|r| r.value("n").and_then(ColumnValue::as_number).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(SortDirection::Asc), vec![1.0, 3.0, 2.0]);
        assert_eq!(order(SortDirection::Desc), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn sort_is_stable() {
        let rows = [
            CatalogRow::new().with("Map", "Narva").with("n", 1),
            CatalogRow::new().with("Map", "Gorodok").with("n", 2),
            CatalogRow::new().with("Map", "Narva").with("n", 3),
        ];
        let mut refs: Vec<&CatalogRow> = rows.iter().collect();
        Sort {
            column: String::from("Map"),
            direction: SortDirection::Asc,
        }
        .apply(&mut refs);
        let ns: Vec<f64> = refs
            .iter()
            .map(|r| r.value("n").and_then(ColumnValue::as_number).unwrap())
            .collect();
        assert_eq!(ns, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn paging() {
        let mut items: Vec<u32> = (0..10).collect();
        Page {
            page_size: 4,
            page_index: 2,
        }
        .apply(&mut items);
        assert_eq!(items, vec![8, 9]);

        let mut items: Vec<u32> = (0..10).collect();
        Page {
            page_size: 4,
            page_index: 3,
        }
        .apply(&mut items);
        assert!(items.is_empty());

        let mut items: Vec<u32> = (0..10).collect();
        Page {
            page_size: 0,
            page_index: 0,
        }
        .apply(&mut items);
        assert!(items.is_empty());
    }

    #[test]
    fn direction_wire_form() {
        let sort: Sort = serde_json::from_str(r#"{"column": "Map", "direction": "DESC"}"#).unwrap();
        assert_eq!(sort.direction, SortDirection::Desc);
        let sort: Sort = serde_json::from_str(r#"{"column": "Map"}"#).unwrap();
        assert_eq!(sort.direction, SortDirection::Asc);
    }
}
