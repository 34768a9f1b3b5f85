//! Filtering, grouping, and component listing.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use rotation_columns::EffectiveColumnSet;
use rotation_filter::{FilterNode, FilterResolver, NoFilters, evaluate_with, validate_with};
use rotation_types::{ColumnValue, RowValues};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueryError;
use crate::group::GroupKey;
use crate::order::{Page, Sort};

/// Rows sharing one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowGroup<'a, R> {
    /// The grouping-column values, in `group_by` order.
    pub key: Vec<ColumnValue>,
    /// Member rows in scan order.
    pub rows: Vec<&'a R>,
}

/// Result of a query: flat rows or groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum QueryResult<'a, R> {
    /// Matching rows in scan order.
    Rows(Vec<&'a R>),
    /// Groups in first-occurrence order of their keys.
    Groups(Vec<RowGroup<'a, R>>),
}

impl<R> QueryResult<'_, R> {
    /// Number of rows across the result.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Groups(groups) => groups.iter().map(|g| g.rows.len()).sum(),
        }
    }
}

/// Filter the catalog and optionally group the survivors.
///
/// A missing filter passes every row. The filter is validated against
/// `columns` before any row is evaluated.
///
/// # Errors
///
/// - [`QueryError::InvalidFilter`] if the filter fails validation.
/// - [`QueryError::UnknownColumn`] if `group_by` names a column missing
///   from `columns`.
pub fn query<'a, R: RowValues>(
    filter: Option<&FilterNode>,
    columns: &EffectiveColumnSet,
    group_by: Option<&[String]>,
    rows: &'a [R],
) -> Result<QueryResult<'a, R>, QueryError> {
    run(filter, columns, group_by, None, rows, &NoFilters)
}

/// A full selection request as sent by the operator UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Row filter; absent passes every row.
    #[serde(default)]
    pub filter: Option<FilterNode>,
    /// Grouping columns.
    #[serde(default)]
    pub group_by: Option<Vec<String>>,
    /// Sort of flat rows, or of the rows within each group.
    #[serde(default)]
    pub sort: Option<Sort>,
    /// Page of the top-level list (rows, or groups when grouping).
    #[serde(default)]
    pub page: Option<Page>,
}

/// A paged query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection<'a, R> {
    /// Size of the top-level list before paging.
    pub total_count: usize,
    /// The requested page.
    pub result: QueryResult<'a, R>,
}

/// Run a [`QueryRequest`], resolving `apply-filter` nodes through
/// `filters`.
///
/// # Errors
///
/// As [`query`], plus [`QueryError::UnknownColumn`] for an unknown sort
/// column.
pub fn query_with<'a, R: RowValues>(
    request: &QueryRequest,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
    rows: &'a [R],
) -> Result<Selection<'a, R>, QueryError> {
    if let Some(sort) = &request.sort {
        require_column(columns, &sort.column)?;
    }
    let mut result = run(
        request.filter.as_ref(),
        columns,
        request.group_by.as_deref(),
        request.sort.as_ref(),
        rows,
        filters,
    )?;
    let total_count = match &mut result {
        QueryResult::Rows(matched) => {
            let total = matched.len();
            if let Some(page) = request.page {
                page.apply(matched);
            }
            total
        }
        QueryResult::Groups(groups) => {
            let total = groups.len();
            if let Some(page) = request.page {
                page.apply(groups);
            }
            total
        }
    };
    Ok(Selection {
        total_count,
        result,
    })
}

fn run<'a, R: RowValues>(
    filter: Option<&FilterNode>,
    columns: &EffectiveColumnSet,
    group_by: Option<&[String]>,
    sort: Option<&Sort>,
    rows: &'a [R],
    filters: &dyn FilterResolver,
) -> Result<QueryResult<'a, R>, QueryError> {
    if let Some(filter) = filter {
        validate_with(filter, columns, filters)?;
    }
    if let Some(group_by) = group_by {
        for column in group_by {
            require_column(columns, column)?;
        }
    }

    let mut matched: Vec<&R> = rows
        .iter()
        .filter(|row| filter.is_none_or(|f| evaluate_with(f, *row, columns, filters)))
        .collect();

    let result = match group_by {
        None => {
            if let Some(sort) = sort {
                sort.apply(&mut matched);
            }
            QueryResult::Rows(matched)
        }
        Some(group_by) => {
            let mut groups = group(matched, group_by);
            if let Some(sort) = sort {
                for g in &mut groups {
                    sort.apply(&mut g.rows);
                }
            }
            QueryResult::Groups(groups)
        }
    };

    debug!(
        scanned = rows.len(),
        matched = result.row_count(),
        groups = match &result {
            QueryResult::Rows(_) => 0,
            QueryResult::Groups(groups) => groups.len(),
        },
        "Query executed"
    );
    Ok(result)
}

fn group<'a, R: RowValues>(rows: Vec<&'a R>, group_by: &[String]) -> Vec<RowGroup<'a, R>> {
    let mut groups: Vec<RowGroup<'a, R>> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for row in rows {
        match index.entry(GroupKey::of(row, group_by)) {
            Entry::Occupied(slot) => {
                if let Some(g) = groups.get_mut(*slot.get()) {
                    g.rows.push(row);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(RowGroup {
                    key: group_by
                        .iter()
                        .map(|c| row.value(c).cloned().unwrap_or(ColumnValue::Null))
                        .collect(),
                    rows: vec![row],
                });
            }
        }
    }
    groups
}

fn require_column(columns: &EffectiveColumnSet, column: &str) -> Result<(), QueryError> {
    if columns.contains(column) {
        Ok(())
    } else {
        Err(QueryError::UnknownColumn {
            column: column.to_owned(),
        })
    }
}

/// Distinct values of one column among the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnValues {
    /// The column.
    pub column: String,
    /// Distinct values in first-occurrence order.
    pub values: Vec<ColumnValue>,
}

/// List the distinct values of each `targets` column among rows passing
/// `filter`, for layer component pickers.
///
/// # Errors
///
/// - [`QueryError::InvalidFilter`] if the filter fails validation.
/// - [`QueryError::UnknownColumn`] for an unknown target.
pub fn distinct_values<R: RowValues>(
    filter: Option<&FilterNode>,
    columns: &EffectiveColumnSet,
    filters: &dyn FilterResolver,
    rows: &[R],
    targets: &[String],
) -> Result<Vec<ColumnValues>, QueryError> {
    for target in targets {
        require_column(columns, target)?;
    }
    let QueryResult::Rows(matched) = run(filter, columns, None, None, rows, filters)? else {
        return Ok(Vec::new());
    };
    Ok(targets
        .iter()
        .map(|column| {
            let mut seen = HashSet::new();
            let values = matched
                .iter()
                .map(|row| row.value(column).cloned().unwrap_or(ColumnValue::Null))
                .filter(|value| seen.insert(GroupKey::single(value)))
                .collect();
            ColumnValues {
                column: column.clone(),
                values,
            }
        })
        .collect())
}
