//! Operator API server for the layer rotation service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for the column set, catalog selections,
//!   component lists, and named filters
//! - **`WebSocket` endpoint** (`/ws/queue`) streaming queue state
//!   snapshots from the service's fan-out channel
//!
//! # Architecture
//!
//! Every handler is a thin adapter over [`RotationService`]. Selections
//! run synchronously against the in-memory catalog; `WebSocket` clients
//! are ordinary channel subscribers whose events are buffered in a
//! per-connection queue, so a slow client never stalls the others.
//!
//! [`RotationService`]: rotation_core::RotationService

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
