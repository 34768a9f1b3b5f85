//! Fan-out of one upstream state subscription to many local subscribers.
//!
//! A [`FanoutChannel`] holds at most one upstream subscription, opened
//! when the first subscriber arrives and torn down when the last one
//! leaves. Every snapshot received from upstream passes through the
//! channel's [`SnapshotTransform`] exactly once, is cached, and is then
//! delivered to every live subscriber in registration order. Subscribers
//! joining later receive the cached snapshot immediately, or
//! [`ChannelEvent::Pending`] when nothing has arrived yet.
//!
//! # Modules
//!
//! - [`channel`] -- [`FanoutChannel`] and its state machine.
//! - [`error`] -- [`UpstreamFailure`].
//! - [`event`] -- [`ChannelEvent`] and [`ChannelState`].
//! - [`handle`] -- [`SubscriberHandle`].
//! - [`parts`] -- [`PartsStore`], the home of stripped queue parts.
//! - [`transform`] -- [`SnapshotTransform`] and [`StripParts`].
//! - [`upstream`] -- The upstream seam and an in-process
//!   [`LocalUpstream`].

pub mod channel;
pub mod error;
pub mod event;
pub mod handle;
pub mod parts;
pub mod transform;
pub mod upstream;

pub use channel::FanoutChannel;
pub use error::UpstreamFailure;
pub use event::{ChannelEvent, ChannelState};
pub use handle::SubscriberHandle;
pub use parts::PartsStore;
pub use transform::{SnapshotTransform, StripParts};
pub use upstream::{LocalUpstream, UpstreamSink, UpstreamSource, UpstreamSubscription};
