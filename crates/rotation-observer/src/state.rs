//! Shared application state for the operator API server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rotation_core::RotationService;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The command interface every handler delegates to.
    pub service: Arc<RotationService>,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state around a service.
    pub fn new(service: Arc<RotationService>) -> Self {
        Self {
            service,
            started_at: Utc::now(),
        }
    }
}
