//! REST API endpoint handlers for the operator server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and channel status |
//! | `GET` | `/api/columns` | Current effective column set |
//! | `POST` | `/api/columns/reload` | Reload extension columns |
//! | `POST` | `/api/selection` | Filter, group, sort, and page the catalog |
//! | `POST` | `/api/components` | Distinct values of picker columns |
//! | `GET` | `/api/filters` | List named filters |
//! | `PUT` | `/api/filters/:id` | Create or replace a named filter |
//! | `DELETE` | `/api/filters/:id` | Remove a named filter |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use rotation_filter::{FilterEntity, FilterNode};
use rotation_query::QueryRequest;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/components`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsRequest {
    /// Row filter; absent passes every row.
    #[serde(default)]
    pub filter: Option<FilterNode>,
    /// Columns to list; defaults to the group-by columns.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness, uptime, and the queue channel's state.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let queue = state.service.queue();
    let uptime = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSeconds": uptime,
        "columnGeneration": state.service.columns().generation(),
        "queue": {
            "state": queue.state(),
            "subscribers": queue.subscriber_count(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Return the current effective column set with its generation.
pub async fn list_columns(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (generation, columns) = state.service.columns().current_versioned();
    Json(serde_json::json!({
        "generation": generation,
        "columns": columns.as_slice(),
    }))
}

/// Reload extension columns from their configured source.
///
/// A rejected reload leaves the previous set in place.
pub async fn reload_columns(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let (generation, columns) = state.service.reload_columns()?;
    Ok(Json(serde_json::json!({
        "generation": generation,
        "columns": columns.as_slice(),
    })))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Run a selection over the layer catalog.
pub async fn start_selection(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.service.start_selection(&request)?))
}

/// List the distinct values of picker columns among matching rows.
pub async fn components(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ComponentsRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let components = state
        .service
        .components(request.filter.as_ref(), request.columns.as_deref())?;
    Ok(Json(serde_json::json!({ "components": components })))
}

// ---------------------------------------------------------------------------
// Named filters
// ---------------------------------------------------------------------------

/// List stored filters in ID order.
pub async fn list_filters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let filters = state.service.filters().list();
    let filters: Vec<&FilterEntity> = filters.iter().map(AsRef::as_ref).collect();
    Json(serde_json::json!({
        "count": filters.len(),
        "filters": filters,
    }))
}

/// Create or replace the filter stored under `id`.
pub async fn put_filter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(entity): Json<FilterEntity>,
) -> Result<impl IntoResponse, ObserverError> {
    if entity.id != id {
        return Err(ObserverError::BadRequest(format!(
            "path id `{id}` does not match body id `{}`",
            entity.id
        )));
    }
    let existed = state.service.filters().get(&id).is_some();
    let stored = state.service.upsert_filter(entity)?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(FilterEntity::clone(&stored))))
}

/// Remove the filter stored under `id`.
pub async fn delete_filter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    state.service.delete_filter(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
