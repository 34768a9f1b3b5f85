//! Upstream failures.

/// The upstream source ended with an error.
///
/// Forwarded to every subscriber of the channel, after which the channel
/// returns to idle. Reconnecting is the upstream collaborator's concern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamFailure {
    /// The connection to the upstream could not be established or broke.
    #[error("upstream connection failed: {0}")]
    Connection(String),

    /// A pushed payload could not be decoded into a snapshot.
    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),

    /// The upstream channel was shut down by the local side.
    #[error("channel disposed")]
    Disposed,
}
