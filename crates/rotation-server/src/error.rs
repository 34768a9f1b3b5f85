//! Error types for the rotation server binary.
//!
//! [`ServerError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the rotation server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rotation_core::ConfigError,
    },

    /// The service could not be assembled.
    #[error("service error: {source}")]
    Service {
        /// The underlying service error.
        #[from]
        source: rotation_core::ServiceError,
    },

    /// NATS connection failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The operator API server failed.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: rotation_observer::ServerError,
    },
}
