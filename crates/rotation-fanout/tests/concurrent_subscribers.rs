//! Subscribers coming and going on several threads while upstream pushes.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rotation_fanout::{
    ChannelEvent, ChannelState, FanoutChannel, LocalUpstream, UpstreamSink, UpstreamSource,
    UpstreamSubscription,
};

/// Wraps a [`LocalUpstream`] and records how many subscriptions were open
/// at once.
#[derive(Clone, Default)]
struct Tracked {
    local: LocalUpstream<u64>,
    open: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

struct TrackedSubscription {
    inner: Box<dyn UpstreamSubscription>,
    open: Arc<AtomicUsize>,
}

impl UpstreamSource<u64> for Tracked {
    fn subscribe(&self, sink: UpstreamSink<u64>) -> Box<dyn UpstreamSubscription> {
        let now = self.open.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.peak.fetch_max(now, Ordering::SeqCst);
        Box::new(TrackedSubscription {
            inner: self.local.subscribe(sink),
            open: Arc::clone(&self.open),
        })
    }
}

impl UpstreamSubscription for TrackedSubscription {
    fn unsubscribe(self: Box<Self>) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        self.inner.unsubscribe();
    }
}

type Seen = Arc<Mutex<Vec<u64>>>;

#[test]
fn racing_subscribers_keep_one_upstream_and_ordered_snapshots() {
    let upstream = Tracked::default();
    let channel = FanoutChannel::passthrough("race", Arc::new(upstream.clone()));
    let stop = Arc::new(AtomicBool::new(false));

    let pusher = {
        let local = upstream.local.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut value = 0_u64;
            while !stop.load(Ordering::SeqCst) {
                value = value.saturating_add(1);
                local.push(&value);
            }
        })
    };

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let channel = channel.clone();
            thread::spawn(move || {
                let mut logs: Vec<Seen> = Vec::new();
                for round in 0..200 {
                    let seen: Seen = Arc::default();
                    let sink = Arc::clone(&seen);
                    let handle = channel.subscribe(move |event: ChannelEvent<u64>| {
                        if let Some(value) = event.snapshot() {
                            sink.lock().unwrap().push(**value);
                        }
                    });
                    if round % 3 == 0 {
                        thread::yield_now();
                    }
                    drop(handle);
                    logs.push(seen);
                }
                logs
            })
        })
        .collect();

    let logs: Vec<Seen> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    stop.store(true, Ordering::SeqCst);
    pusher.join().unwrap();

    assert!(upstream.peak.load(Ordering::SeqCst) <= 1);
    assert_eq!(upstream.open.load(Ordering::SeqCst), 0);
    assert_eq!(channel.state(), ChannelState::Idle);
    assert_eq!(channel.subscriber_count(), 0);
    assert_eq!(upstream.local.active_count(), 0);
    assert_eq!(
        upstream.local.subscribe_count(),
        upstream.local.unsubscribe_count()
    );
    for seen in &logs {
        let seen = seen.lock().unwrap();
        assert!(
            seen.windows(2).all(|pair| pair.first() <= pair.last()),
            "snapshots went backwards: {seen:?}"
        );
    }
}

#[test]
fn overlapping_subscribers_share_one_connection() {
    let upstream = Tracked::default();
    let channel = FanoutChannel::passthrough("shared", Arc::new(upstream.clone()));
    let anchor = channel.subscribe(|_: ChannelEvent<u64>| {});
    let received = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let channel = channel.clone();
            let local = upstream.local.clone();
            let received = Arc::clone(&received);
            thread::spawn(move || {
                for value in 0..100_u64 {
                    let received = Arc::clone(&received);
                    let handle = channel.subscribe(move |event: ChannelEvent<u64>| {
                        if event.snapshot().is_some() {
                            received.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                    local.push(&value);
                    drop(handle);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(upstream.local.subscribe_count(), 1);
    assert_eq!(upstream.peak.load(Ordering::SeqCst), 1);
    assert!(received.load(Ordering::SeqCst) >= 400);
    assert_eq!(channel.state(), ChannelState::Live);

    drop(anchor);
    assert_eq!(channel.state(), ChannelState::Idle);
    assert_eq!(upstream.local.unsubscribe_count(), 1);
}
