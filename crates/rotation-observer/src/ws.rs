//! `WebSocket` handler for real-time queue state streaming.
//!
//! Clients connect to `GET /ws/queue` and become subscribers of the
//! service's queue channel. The first frame is the cached snapshot, or a
//! `pending` frame when none has arrived yet; every later upstream push
//! produces one `snapshot` frame. When the upstream ends, the client
//! receives a `completed` or `failed` frame and the socket is closed.
//!
//! Events are buffered per connection, so a slow client only delays
//! itself.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use rotation_fanout::ChannelEvent;
use rotation_types::QueueStateUpdate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::state::AppState;

/// One JSON text frame sent to a queue state client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueFrame<'a> {
    /// No snapshot has arrived yet.
    Pending,
    /// The latest queue state, without heavy parts.
    Snapshot {
        /// The snapshot.
        state: &'a QueueStateUpdate,
    },
    /// The upstream ended normally.
    Completed,
    /// The upstream failed.
    Failed {
        /// Failure description.
        error: String,
    },
}

impl<'a> From<&'a ChannelEvent<QueueStateUpdate>> for QueueFrame<'a> {
    fn from(event: &'a ChannelEvent<QueueStateUpdate>) -> Self {
        match event {
            ChannelEvent::Pending => Self::Pending,
            ChannelEvent::Snapshot(state) => Self::Snapshot { state },
            ChannelEvent::Completed => Self::Completed,
            ChannelEvent::Failed(failure) => Self::Failed {
                error: failure.to_string(),
            },
        }
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming queue state.
///
/// # Route
///
/// `GET /ws/queue`
pub async fn ws_queue(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe to the queue channel and
/// forward each event as a text frame.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (handle, mut rx) = state.service.subscribe_to_queue_state_channel();
    debug!(subscriber = %handle.id(), "WebSocket client connected");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("Queue channel closed, shutting down WebSocket");
                    break;
                };
                let json = match serde_json::to_string(&QueueFrame::from(&event)) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize queue frame: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    break;
                }
                if event.is_terminal() {
                    // The peer may already be gone.
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }

    state.service.unsubscribe(handle);
}
