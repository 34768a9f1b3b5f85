//! Axum router construction for the operator API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the operator server.
///
/// The router includes:
/// - `GET /health` -- liveness and queue channel status
/// - `GET /ws/queue` -- `WebSocket` queue state stream
/// - `GET /api/columns` -- effective column set
/// - `POST /api/columns/reload` -- reload extension columns
/// - `POST /api/selection` -- catalog selection
/// - `POST /api/components` -- distinct picker values
/// - `GET /api/filters` -- list named filters
/// - `PUT /api/filters/{id}` -- store a named filter
/// - `DELETE /api/filters/{id}` -- remove a named filter
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/queue", get(ws::ws_queue))
        // REST API
        .route("/api/columns", get(handlers::list_columns))
        .route("/api/columns/reload", post(handlers::reload_columns))
        .route("/api/selection", post(handlers::start_selection))
        .route("/api/components", post(handlers::components))
        .route("/api/filters", get(handlers::list_filters))
        .route(
            "/api/filters/{id}",
            put(handlers::put_filter).delete(handlers::delete_filter),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
