//! The upstream state source seam.
//!
//! An [`UpstreamSource`] pushes whole snapshots (never deltas) into the
//! [`UpstreamSink`] it was handed on subscribe, and ends the stream with
//! [`complete`](UpstreamSink::complete) or
//! [`error`](UpstreamSink::error). The returned
//! [`UpstreamSubscription`] is released exactly once by the channel.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::channel::Inner;
use crate::error::UpstreamFailure;

/// A source of whole-state snapshots.
pub trait UpstreamSource<T>: Send + Sync {
    /// Start pushing snapshots into `sink`.
    ///
    /// Connection failures are reported through
    /// [`UpstreamSink::error`], possibly before this call returns.
    fn subscribe(&self, sink: UpstreamSink<T>) -> Box<dyn UpstreamSubscription>;
}

/// A live upstream subscription.
pub trait UpstreamSubscription: Send {
    /// Stop pushing and release the subscription's resources.
    ///
    /// Called from whichever thread last touched the channel; must not
    /// block on a push in progress.
    fn unsubscribe(self: Box<Self>);
}

/// Where an upstream source delivers snapshots.
///
/// Holds only a weak reference to its channel and the connection epoch it
/// was created for, so pushes that arrive after the channel tore the
/// connection down are ignored.
pub struct UpstreamSink<T> {
    channel: Weak<Inner<T>>,
    epoch: u64,
}

impl<T> Clone for UpstreamSink<T> {
    fn clone(&self) -> Self {
        Self {
            channel: Weak::clone(&self.channel),
            epoch: self.epoch,
        }
    }
}

impl<T> core::fmt::Debug for UpstreamSink<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpstreamSink")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl<T> UpstreamSink<T> {
    pub(crate) const fn new(channel: Weak<Inner<T>>, epoch: u64) -> Self {
        Self { channel, epoch }
    }
}

impl<T: Send + Sync + 'static> UpstreamSink<T> {
    /// Push a new snapshot, replacing the previous one.
    pub fn data(&self, snapshot: T) {
        if let Some(channel) = self.channel.upgrade() {
            channel.on_data(self.epoch, snapshot);
        }
    }

    /// End the stream normally.
    pub fn complete(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.on_end(self.epoch, None);
        }
    }

    /// End the stream with a failure.
    pub fn error(&self, failure: UpstreamFailure) {
        if let Some(channel) = self.channel.upgrade() {
            channel.on_end(self.epoch, Some(failure));
        }
    }

    /// Whether the channel still listens to this sink.
    pub fn is_current(&self) -> bool {
        self.channel
            .upgrade()
            .is_some_and(|channel| channel.current_epoch() == Some(self.epoch))
    }
}

/// An in-process upstream driven by explicit calls.
///
/// Used for embedding without a message bus and in tests: every
/// [`push`](Self::push) is delivered synchronously to all current sinks.
pub struct LocalUpstream<T> {
    state: Arc<Mutex<LocalState<T>>>,
}

struct LocalState<T> {
    sinks: Vec<(u64, UpstreamSink<T>)>,
    next_key: u64,
    subscribes: usize,
    unsubscribes: usize,
}

impl<T> Default for LocalUpstream<T> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LocalState {
                sinks: Vec::new(),
                next_key: 0,
                subscribes: 0,
                unsubscribes: 0,
            })),
        }
    }
}

impl<T> Clone for LocalUpstream<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> core::fmt::Debug for LocalUpstream<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LocalUpstream")
            .field("active", &state.sinks.len())
            .field("subscribes", &state.subscribes)
            .field("unsubscribes", &state.unsubscribes)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> LocalUpstream<T> {
    /// Create an upstream with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `snapshot` to every current sink. Returns how many sinks
    /// received it.
    pub fn push(&self, snapshot: &T) -> usize {
        let sinks = self.sinks();
        for sink in &sinks {
            sink.data(snapshot.clone());
        }
        sinks.len()
    }

    /// End every current stream normally.
    pub fn complete(&self) {
        for sink in self.sinks() {
            sink.complete();
        }
    }

    /// End every current stream with `failure`.
    pub fn fail(&self, failure: &UpstreamFailure) {
        for sink in self.sinks() {
            sink.error(failure.clone());
        }
    }

    /// Number of subscriptions ever opened.
    pub fn subscribe_count(&self) -> usize {
        self.lock().subscribes
    }

    /// Number of subscriptions released.
    pub fn unsubscribe_count(&self) -> usize {
        self.lock().unsubscribes
    }

    /// Number of subscriptions currently open.
    pub fn active_count(&self) -> usize {
        self.lock().sinks.len()
    }

    fn sinks(&self) -> Vec<UpstreamSink<T>> {
        self.lock().sinks.iter().map(|(_, sink)| sink.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + Sync + 'static> UpstreamSource<T> for LocalUpstream<T> {
    fn subscribe(&self, sink: UpstreamSink<T>) -> Box<dyn UpstreamSubscription> {
        let mut state = self.lock();
        let key = state.next_key;
        state.next_key = state.next_key.wrapping_add(1);
        state.subscribes = state.subscribes.saturating_add(1);
        state.sinks.push((key, sink));
        Box::new(LocalSubscription {
            key,
            state: Arc::downgrade(&self.state),
        })
    }
}

struct LocalSubscription<T> {
    key: u64,
    state: Weak<Mutex<LocalState<T>>>,
}

impl<T: Send + Sync + 'static> UpstreamSubscription for LocalSubscription<T> {
    fn unsubscribe(self: Box<Self>) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.sinks.retain(|(key, _)| *key != self.key);
            state.unsubscribes = state.unsubscribes.saturating_add(1);
        }
    }
}
