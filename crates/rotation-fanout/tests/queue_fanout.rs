//! Queue snapshots flowing through a stripping fan-out channel.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rotation_fanout::{
    ChannelEvent, ChannelState, FanoutChannel, LocalUpstream, PartsStore, StripParts,
    UpstreamFailure,
};
use rotation_types::{MatchHistoryEntry, QueueItem, QueueParts, QueueStateUpdate, UserSummary};

fn snapshot(seq_id: u64, with_parts: bool) -> QueueStateUpdate {
    QueueStateUpdate {
        server_id: String::from("main"),
        seq_id,
        pushed_at: Utc::now(),
        layer_queue: vec![QueueItem {
            item_id: format!("item-{seq_id}"),
            layer_id: String::from("NV-RAAS-V1"),
            added_by: Some(String::from("76561198000000000")),
        }],
        parts: with_parts.then(|| QueueParts {
            users: vec![UserSummary {
                user_id: String::from("76561198000000000"),
                username: String::from("operator"),
            }],
            layer_statuses: None,
            match_history: vec![MatchHistoryEntry {
                history_entry_id: seq_id,
                layer_id: String::from("GD-AAS-V2"),
                started_at: None,
            }],
        }),
    }
}

struct Fixture {
    upstream: LocalUpstream<QueueStateUpdate>,
    parts: Arc<PartsStore>,
    channel: FanoutChannel<QueueStateUpdate>,
}

fn fixture() -> Fixture {
    let upstream = LocalUpstream::new();
    let parts = Arc::new(PartsStore::new());
    let channel = FanoutChannel::new(
        "queue",
        Arc::new(upstream.clone()),
        StripParts::new(Arc::clone(&parts)),
    );
    Fixture {
        upstream,
        parts,
        channel,
    }
}

type Seen = Arc<Mutex<Vec<ChannelEvent<QueueStateUpdate>>>>;

fn recorder() -> (Seen, impl FnMut(ChannelEvent<QueueStateUpdate>) + Send + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event| sink.lock().unwrap().push(event))
}

#[test]
fn upstream_subscription_count_follows_subscribers() {
    let f = fixture();
    assert_eq!(f.upstream.subscribe_count(), 0);

    let mut handles = Vec::new();
    for n in 1..=5 {
        handles.push(f.channel.subscribe(|_| {}));
        assert_eq!(f.upstream.subscribe_count(), 1, "after subscriber {n}");
    }
    while let Some(mut handle) = handles.pop() {
        handle.unsubscribe();
        let expected = usize::from(handles.is_empty());
        assert_eq!(f.upstream.unsubscribe_count(), expected);
    }
    assert_eq!(f.channel.state(), ChannelState::Idle);
    assert_eq!(f.upstream.active_count(), 0);
}

#[test]
fn subscribers_and_late_joiners_never_see_parts() {
    let f = fixture();
    let (early, callback) = recorder();
    let _early = f.channel.subscribe(callback);

    f.upstream.push(&snapshot(1, true));

    let (late, callback) = recorder();
    let _late = f.channel.subscribe(callback);

    for seen in [&early, &late] {
        let seen = seen.lock().unwrap();
        let last = seen.last().and_then(ChannelEvent::snapshot).unwrap();
        assert!(!last.has_parts());
        assert_eq!(last.seq_id, 1);
    }
    assert!(!f.channel.cached().unwrap().has_parts());
    assert_eq!(f.parts.absorbed(), 1);
    assert!(f.parts.user("76561198000000000").is_some());

    // Both subscribers share the one stripped snapshot.
    let early_snapshot = early.lock().unwrap().last().and_then(ChannelEvent::snapshot).cloned();
    let late_snapshot = late.lock().unwrap().last().and_then(ChannelEvent::snapshot).cloned();
    assert!(Arc::ptr_eq(&early_snapshot.unwrap(), &late_snapshot.unwrap()));
}

#[test]
fn snapshots_without_parts_pass_untouched() {
    let f = fixture();
    let (seen, callback) = recorder();
    let _h = f.channel.subscribe(callback);
    f.upstream.push(&snapshot(4, false));
    assert_eq!(f.parts.absorbed(), 0);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen.first(), Some(ChannelEvent::Pending)));
}

#[test]
fn failure_resets_to_idle_and_resubscribe_reconnects() {
    let f = fixture();
    let (seen, callback) = recorder();
    let mut handle = f.channel.subscribe(callback);
    f.upstream.push(&snapshot(1, false));

    f.upstream
        .fail(&UpstreamFailure::Connection(String::from("broker went away")));
    assert_eq!(f.channel.state(), ChannelState::Idle);
    assert!(f.channel.cached().is_none());
    assert_eq!(f.channel.subscriber_count(), 0);
    assert!(matches!(
        seen.lock().unwrap().last(),
        Some(ChannelEvent::Failed(UpstreamFailure::Connection(_)))
    ));
    assert!(!handle.unsubscribe());

    // A push from the dead connection is ignored.
    f.upstream.push(&snapshot(2, false));
    assert_eq!(seen.lock().unwrap().len(), 3);

    let (again, callback) = recorder();
    let _again = f.channel.subscribe(callback);
    assert_eq!(f.upstream.subscribe_count(), 2);
    assert_eq!(f.channel.state(), ChannelState::Live);
    assert!(matches!(again.lock().unwrap().first(), Some(ChannelEvent::Pending)));
}

#[test]
fn completion_is_forwarded() {
    let f = fixture();
    let (seen, callback) = recorder();
    let _h = f.channel.subscribe(callback);
    f.upstream.complete();
    assert!(matches!(seen.lock().unwrap().last(), Some(ChannelEvent::Completed)));
    assert_eq!(f.channel.state(), ChannelState::Idle);
}

#[tokio::test]
async fn channel_adapter_buffers_events() {
    let f = fixture();
    let (handle, mut rx) = f.channel.subscribe_channel();
    f.upstream.push(&snapshot(1, true));
    f.upstream.push(&snapshot(2, false));

    assert!(matches!(rx.recv().await, Some(ChannelEvent::Pending)));
    let first = rx.recv().await.unwrap();
    assert_eq!(first.snapshot().map(|s| s.seq_id), Some(1));
    let second = rx.recv().await.unwrap();
    assert_eq!(second.snapshot().map(|s| s.seq_id), Some(2));

    f.channel.dispose();
    assert!(matches!(rx.recv().await, Some(ChannelEvent::Completed)));
    assert!(rx.recv().await.is_none());
    drop(handle);
}
