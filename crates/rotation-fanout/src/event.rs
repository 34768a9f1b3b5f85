//! Events delivered to subscribers and the channel's lifecycle state.

use std::sync::Arc;

use serde::Serialize;

use crate::error::UpstreamFailure;

/// What a subscriber receives.
#[derive(Debug)]
pub enum ChannelEvent<T> {
    /// No snapshot has arrived yet.
    Pending,
    /// The latest snapshot, already transformed. Shared by all subscribers.
    Snapshot(Arc<T>),
    /// The upstream ended normally. No further events follow.
    Completed,
    /// The upstream failed. No further events follow.
    Failed(UpstreamFailure),
}

impl<T> ChannelEvent<T> {
    /// Whether this is the last event a subscriber will receive.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// The snapshot payload, if any.
    pub const fn snapshot(&self) -> Option<&Arc<T>> {
        match self {
            Self::Snapshot(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

impl<T> Clone for ChannelEvent<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Snapshot(snapshot) => Self::Snapshot(Arc::clone(snapshot)),
            Self::Completed => Self::Completed,
            Self::Failed(failure) => Self::Failed(failure.clone()),
        }
    }
}

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// No subscribers and no upstream subscription.
    Idle,
    /// The first subscriber arrived; the upstream subscription is being
    /// opened.
    Connecting,
    /// Upstream subscribed with at least one local subscriber.
    Live,
}

impl core::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Live => "live",
        })
    }
}
