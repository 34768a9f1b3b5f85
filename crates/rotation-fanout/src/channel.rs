//! The fan-out channel and its state machine.
//!
//! ```text
//! Idle --first subscribe--> Connecting --upstream subscribed--> Live
//!  ^                                                             |
//!  +---- last unsubscribe / upstream completed or failed --------+
//! ```
//!
//! The subscriber list is copy-on-write: each delivery turn works on the
//! list as it was when the turn started, and each subscriber's liveness
//! flag is checked again at the moment of delivery so an unsubscribe
//! takes effect immediately.
//!
//! Callbacks run outside every channel lock, so they may subscribe,
//! unsubscribe, dispose the channel or make the upstream push again.
//! An event for a subscriber whose callback is already running is queued
//! and handed over in order once that callback returns.
//!
//! Opening and releasing upstream subscriptions is done by one thread at
//! a time, releases first, so at most one upstream subscription is open.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rotation_types::{ChannelId, SubscriberId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::UpstreamFailure;
use crate::event::{ChannelEvent, ChannelState};
use crate::handle::SubscriberHandle;
use crate::transform::SnapshotTransform;
use crate::upstream::{UpstreamSink, UpstreamSource, UpstreamSubscription};

type Callback<T> = Box<dyn FnMut(ChannelEvent<T>) + Send>;
type SubscriberList<T> = Arc<Vec<Arc<Subscriber<T>>>>;

/// A single-upstream, many-subscriber channel with last-value caching.
///
/// Cloning yields another handle to the same channel.
pub struct FanoutChannel<T> {
    inner: Arc<Inner<T>>,
}

pub(crate) struct Inner<T> {
    id: ChannelId,
    name: String,
    upstream: Arc<dyn UpstreamSource<T>>,
    transform: Box<dyn SnapshotTransform<T>>,
    shared: Mutex<Shared<T>>,
}

struct Shared<T> {
    state: ChannelState,
    /// Bumped on every connect and teardown; sinks from older epochs are
    /// ignored.
    epoch: u64,
    subscribers: SubscriberList<T>,
    cached: Option<Arc<T>>,
    upstream: Option<Box<dyn UpstreamSubscription>>,
    /// Detached upstream subscriptions waiting to be released.
    retired: Vec<Box<dyn UpstreamSubscription>>,
    /// Set while a thread opens or releases upstream subscriptions.
    driving: bool,
    /// Delivery sequence, monotonic over the channel's lifetime.
    seq: u64,
    disposed: bool,
}

struct Subscriber<T> {
    id: SubscriberId,
    alive: AtomicBool,
    slot: Mutex<Slot<T>>,
}

struct Slot<T> {
    /// `None` while the callback runs.
    callback: Option<Callback<T>>,
    last_seq: Option<u64>,
    queued: VecDeque<ChannelEvent<T>>,
}

impl<T> Subscriber<T> {
    fn new(callback: Callback<T>) -> Self {
        Self {
            id: SubscriberId::new(),
            alive: AtomicBool::new(true),
            slot: Mutex::new(Slot {
                callback: Some(callback),
                last_seq: None,
                queued: VecDeque::new(),
            }),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Deliver unless the subscriber is gone or already saw a later event.
    ///
    /// If the callback is busy, on this thread or another, the event is
    /// queued for whoever is running it.
    fn deliver(&self, seq: u64, event: ChannelEvent<T>) {
        let mut slot = self.lock_slot();
        if !self.is_alive() {
            return;
        }
        if slot.last_seq.is_some_and(|last| seq <= last) {
            return;
        }
        slot.last_seq = Some(seq);
        slot.queued.push_back(event);
        let Some(mut callback) = slot.callback.take() else {
            return;
        };
        while let Some(event) = slot.queued.pop_front() {
            // Terminal events are sent after the subscriber is killed.
            if !event.is_terminal() && !self.is_alive() {
                continue;
            }
            drop(slot);
            callback(event);
            slot = self.lock_slot();
        }
        slot.callback = Some(callback);
    }

    fn kill(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// What a teardown leaves to deliver outside the lock.
struct Teardown<T> {
    subscribers: SubscriberList<T>,
    seq: u64,
}

impl<T> Teardown<T> {
    /// Send `event` to every former subscriber as its last event.
    fn finish(self, event: &ChannelEvent<T>) {
        for subscriber in self.subscribers.iter() {
            subscriber.deliver(self.seq, event.clone());
            subscriber.kill();
        }
    }
}

impl<T> Shared<T> {
    /// Return to idle: forget subscribers and cache, retire the upstream.
    fn teardown(&mut self) -> Teardown<T> {
        self.state = ChannelState::Idle;
        self.epoch = self.epoch.wrapping_add(1);
        self.cached = None;
        self.seq = self.seq.wrapping_add(1);
        if let Some(upstream) = self.upstream.take() {
            self.retired.push(upstream);
        }
        Teardown {
            subscribers: std::mem::take(&mut self.subscribers),
            seq: self.seq,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.state != ChannelState::Idle
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current_epoch(&self) -> Option<u64> {
        let shared = self.lock();
        (shared.state != ChannelState::Idle).then_some(shared.epoch)
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub(crate) fn remove(self: &Arc<Self>, id: SubscriberId) -> bool {
        let idle = {
            let mut shared = self.lock();
            let Some(subscriber) = shared.subscribers.iter().find(|s| s.id == id) else {
                return false;
            };
            subscriber.kill();
            let remaining: Vec<_> = shared
                .subscribers
                .iter()
                .filter(|s| s.id != id)
                .cloned()
                .collect();
            shared.subscribers = Arc::new(remaining);
            debug!(
                channel = %self.name,
                subscriber_id = %id,
                subscribers = shared.subscribers.len(),
                "Subscriber removed"
            );
            let idle = shared.subscribers.is_empty() && shared.state != ChannelState::Idle;
            if idle {
                // Nobody is left to receive a terminal event.
                shared.teardown();
            }
            idle
        };
        if idle {
            info!(channel = %self.name, channel_id = %self.id, "Last subscriber left, channel idle");
            self.drive();
        }
        true
    }

    /// Release retired upstream subscriptions, then open one if the
    /// channel is connecting, until nothing is left to do.
    ///
    /// Returns at once when another call is already driving; that call
    /// picks up the work queued here.
    fn drive(self: &Arc<Self>) {
        {
            let mut shared = self.lock();
            if shared.driving {
                return;
            }
            shared.driving = true;
        }
        loop {
            let (retired, connect) = {
                let mut shared = self.lock();
                let retired = std::mem::take(&mut shared.retired);
                let connect = (retired.is_empty() && shared.state == ChannelState::Connecting)
                    .then_some(shared.epoch);
                if retired.is_empty() && connect.is_none() {
                    shared.driving = false;
                    return;
                }
                (retired, connect)
            };
            for upstream in retired {
                upstream.unsubscribe();
            }
            if let Some(epoch) = connect {
                self.connect(epoch);
            }
        }
    }

    fn connect(self: &Arc<Self>, epoch: u64) {
        info!(channel = %self.name, channel_id = %self.id, epoch, "Opening upstream subscription");
        let sink = UpstreamSink::new(Arc::downgrade(self), epoch);
        let subscription = self.upstream.subscribe(sink);

        let mut shared = self.lock();
        if shared.epoch == epoch && shared.state == ChannelState::Connecting {
            shared.upstream = Some(subscription);
            shared.state = ChannelState::Live;
            drop(shared);
            info!(channel = %self.name, channel_id = %self.id, epoch, "Channel live");
        } else {
            shared.retired.push(subscription);
            drop(shared);
            debug!(
                channel = %self.name,
                epoch,
                "Channel moved on while connecting, releasing upstream"
            );
        }
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    fn subscribe(self: &Arc<Self>, callback: Callback<T>) -> SubscriberHandle<T> {
        let subscriber = Arc::new(Subscriber::new(callback));
        let id = subscriber.id;
        let handle = SubscriberHandle::new(id, Arc::downgrade(self));

        let (initial, seq, connect) = {
            let mut shared = self.lock();
            if shared.disposed {
                drop(shared);
                subscriber.deliver(0, ChannelEvent::Completed);
                subscriber.kill();
                return handle;
            }
            let mut list = Vec::with_capacity(shared.subscribers.len().saturating_add(1));
            list.extend(shared.subscribers.iter().cloned());
            list.push(Arc::clone(&subscriber));
            shared.subscribers = Arc::new(list);

            let connect = shared.state == ChannelState::Idle;
            if connect {
                shared.state = ChannelState::Connecting;
                shared.epoch = shared.epoch.wrapping_add(1);
            }
            let initial = shared
                .cached
                .as_ref()
                .map_or(ChannelEvent::Pending, |s| ChannelEvent::Snapshot(Arc::clone(s)));
            debug!(
                channel = %self.name,
                subscriber_id = %id,
                subscribers = shared.subscribers.len(),
                "Subscriber added"
            );
            (initial, shared.seq, connect)
        };

        subscriber.deliver(seq, initial);
        if connect {
            self.drive();
        }
        handle
    }

    pub(crate) fn on_data(&self, epoch: u64, snapshot: T) {
        if !self.lock().is_current(epoch) {
            debug!(channel = %self.name, epoch, "Dropping snapshot from outdated upstream");
            return;
        }
        let snapshot = Arc::new(self.transform.apply(snapshot));
        let (subscribers, seq) = {
            let mut shared = self.lock();
            if !shared.is_current(epoch) {
                return;
            }
            shared.cached = Some(Arc::clone(&snapshot));
            shared.seq = shared.seq.wrapping_add(1);
            (Arc::clone(&shared.subscribers), shared.seq)
        };
        debug!(channel = %self.name, seq, subscribers = subscribers.len(), "Snapshot fanned out");
        for subscriber in subscribers.iter() {
            subscriber.deliver(seq, ChannelEvent::Snapshot(Arc::clone(&snapshot)));
        }
    }

    pub(crate) fn on_end(self: &Arc<Self>, epoch: u64, failure: Option<UpstreamFailure>) {
        let teardown = {
            let mut shared = self.lock();
            if !shared.is_current(epoch) {
                return;
            }
            shared.teardown()
        };
        let event = match failure {
            Some(failure) => {
                warn!(
                    channel = %self.name,
                    channel_id = %self.id,
                    error = %failure,
                    subscribers = teardown.subscribers.len(),
                    "Upstream failed, channel idle"
                );
                ChannelEvent::Failed(failure)
            }
            None => {
                info!(
                    channel = %self.name,
                    channel_id = %self.id,
                    subscribers = teardown.subscribers.len(),
                    "Upstream completed, channel idle"
                );
                ChannelEvent::Completed
            }
        };
        self.drive();
        teardown.finish(&event);
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        let retired = std::mem::take(&mut shared.retired);
        for upstream in shared.upstream.take().into_iter().chain(retired) {
            upstream.unsubscribe();
        }
    }
}

impl<T: Send + Sync + 'static> FanoutChannel<T> {
    /// Create an idle channel over `upstream`, applying `transform` to
    /// every snapshot.
    pub fn new(
        name: impl Into<String>,
        upstream: Arc<dyn UpstreamSource<T>>,
        transform: impl SnapshotTransform<T> + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ChannelId::new(),
                name: name.into(),
                upstream,
                transform: Box::new(transform),
                shared: Mutex::new(Shared {
                    state: ChannelState::Idle,
                    epoch: 0,
                    subscribers: Arc::new(Vec::new()),
                    cached: None,
                    upstream: None,
                    retired: Vec::new(),
                    driving: false,
                    seq: 0,
                    disposed: false,
                }),
            }),
        }
    }

    /// Create a channel that forwards snapshots unchanged.
    pub fn passthrough(name: impl Into<String>, upstream: Arc<dyn UpstreamSource<T>>) -> Self {
        Self::new(name, upstream, |snapshot: T| snapshot)
    }

    /// Register a subscriber.
    ///
    /// Before this returns, `callback` receives the cached snapshot, or
    /// [`ChannelEvent::Pending`] when there is none yet. The first
    /// subscriber opens the upstream subscription. On a disposed channel
    /// the callback receives [`ChannelEvent::Completed`] and nothing else.
    ///
    /// Callbacks run on a thread that is delivering to the channel, one
    /// event at a time per subscriber, and must not block; slow consumers should buffer on their side, for example
    /// with [`subscribe_channel`](Self::subscribe_channel).
    pub fn subscribe<F>(&self, callback: F) -> SubscriberHandle<T>
    where
        F: FnMut(ChannelEvent<T>) + Send + 'static,
    {
        self.inner.subscribe(Box::new(callback))
    }

    /// Register a subscriber whose events are buffered in an unbounded
    /// queue.
    ///
    /// The queue closes after the terminal event.
    pub fn subscribe_channel(
        &self,
    ) -> (SubscriberHandle<T>, mpsc::UnboundedReceiver<ChannelEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(move |event| {
            // A closed receiver only means the consumer stopped reading.
            let _ = tx.send(event);
        });
        (handle, rx)
    }

    /// Unsubscribe `handle`. Equivalent to dropping it.
    pub fn unsubscribe(&self, mut handle: SubscriberHandle<T>) {
        handle.unsubscribe();
    }

    /// Tear the channel down for good.
    ///
    /// The upstream subscription is released, every subscriber receives
    /// [`ChannelEvent::Completed`], and later subscribers are completed
    /// immediately.
    pub fn dispose(&self) {
        let teardown = {
            let mut shared = self.inner.lock();
            if shared.disposed {
                return;
            }
            shared.disposed = true;
            shared.teardown()
        };
        info!(
            channel = %self.inner.name,
            channel_id = %self.inner.id,
            subscribers = teardown.subscribers.len(),
            "Channel disposed"
        );
        self.inner.drive();
        teardown.finish(&ChannelEvent::Completed);
    }
}

impl<T> FanoutChannel<T> {
    /// Channel identifier.
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Channel name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// The cached snapshot, if one has arrived since the channel went live.
    pub fn cached(&self) -> Option<Arc<T>> {
        self.inner.lock().cached.clone()
    }

    /// Whether [`dispose`](FanoutChannel::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}

impl<T> Clone for FanoutChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> core::fmt::Debug for FanoutChannel<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let shared = self.inner.lock();
        f.debug_struct("FanoutChannel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &shared.state)
            .field("subscribers", &shared.subscribers.len())
            .finish_non_exhaustive()
    }
}
