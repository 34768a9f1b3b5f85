//! Error types for the operator API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rotation_core::ServiceError;
use rotation_filter::FilterStoreError;
use rotation_query::QueryError;

/// Errors that can occur in the operator API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The request body or path is inconsistent.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A command of the service failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ObserverError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(e) => service_status(e),
        }
    }
}

fn service_status(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Query(QueryError::InvalidFilter(_) | QueryError::UnknownColumn { .. })
        | ServiceError::Filter(FilterStoreError::Invalid(_) | FilterStoreError::Filter(_)) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Filter(FilterStoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        ServiceError::Filter(FilterStoreError::InUse { .. }) => StatusCode::CONFLICT,
        ServiceError::Columns(e) if e.is_conflict() => StatusCode::CONFLICT,
        ServiceError::Columns(_)
        | ServiceError::Catalog(_)
        | ServiceError::Query(QueryError::Catalog(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let Self::Service(
            ServiceError::Query(QueryError::InvalidFilter(e))
            | ServiceError::Filter(FilterStoreError::Filter(e)),
        ) = &self
            && let (Some(path), Some(fields)) = (e.path(), body.as_object_mut())
        {
            fields.insert(String::from("path"), serde_json::json!(path.indices()));
        }

        (status, axum::Json(body)).into_response()
    }
}
