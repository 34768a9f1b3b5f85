//! NATS-backed queue state upstream.
//!
//! [`NatsUpstream`] implements [`UpstreamSource`] by subscribing to a
//! subject carrying JSON-encoded [`QueueStateUpdate`] snapshots. Each
//! channel connection gets its own NATS subscription, driven by a task on
//! the runtime the upstream was created on.
//!
//! An undecodable payload ends the stream with
//! [`UpstreamFailure::Decode`]; the subscription stream closing ends it
//! with completion.

use futures::StreamExt as _;
use rotation_fanout::{UpstreamFailure, UpstreamSink, UpstreamSource, UpstreamSubscription};
use rotation_types::QueueStateUpdate;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ServerError;

/// Queue state snapshots received over NATS.
#[derive(Debug, Clone)]
pub struct NatsUpstream {
    client: async_nats::Client,
    subject: String,
    runtime: Handle,
}

impl NatsUpstream {
    /// Connect to a NATS server.
    ///
    /// Must be called from within a Tokio runtime; subscriptions are
    /// driven on that runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str, subject: impl Into<String>) -> Result<Self, ServerError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ServerError::Nats {
                message: format!("failed to connect to NATS at {url}: {e}"),
            })?;
        Ok(Self {
            client,
            subject: subject.into(),
            runtime: Handle::current(),
        })
    }
}

impl UpstreamSource<QueueStateUpdate> for NatsUpstream {
    fn subscribe(&self, sink: UpstreamSink<QueueStateUpdate>) -> Box<dyn UpstreamSubscription> {
        let client = self.client.clone();
        let subject = self.subject.clone();
        let task = self.runtime.spawn(async move {
            let mut subscriber = match client.subscribe(subject.clone()).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    warn!(subject, error = %e, "Failed to subscribe to queue state");
                    sink.error(UpstreamFailure::Connection(e.to_string()));
                    return;
                }
            };
            info!(subject, "Subscribed to queue state");

            while let Some(message) = subscriber.next().await {
                match decode(&message.payload) {
                    Ok(update) => {
                        debug!(
                            server_id = %update.server_id,
                            seq_id = update.seq_id,
                            "Queue state received"
                        );
                        sink.data(update);
                    }
                    Err(failure) => {
                        warn!(subject, error = %failure, "Dropping queue state subscription");
                        sink.error(failure);
                        return;
                    }
                }
            }

            info!(subject, "Queue state subscription closed");
            sink.complete();
        });
        Box::new(NatsSubscription { task })
    }
}

/// A running NATS subscription task.
struct NatsSubscription {
    task: JoinHandle<()>,
}

impl UpstreamSubscription for NatsSubscription {
    fn unsubscribe(self: Box<Self>) {
        // Dropping the NATS subscriber inside the task unsubscribes it.
        self.task.abort();
    }
}

/// Decode one NATS payload into a snapshot.
fn decode(payload: &[u8]) -> Result<QueueStateUpdate, UpstreamFailure> {
    serde_json::from_slice(payload).map_err(|e| UpstreamFailure::Decode(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn decodes_snapshot_payloads() {
        let update = QueueStateUpdate {
            server_id: String::from("main"),
            seq_id: 4,
            pushed_at: Utc::now(),
            layer_queue: Vec::new(),
            parts: None,
        };
        let payload = serde_json::to_vec(&update).unwrap();
        assert_eq!(decode(&payload).unwrap(), update);
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        assert!(matches!(
            decode(b"{\"serverId\": 1"),
            Err(UpstreamFailure::Decode(_))
        ));
    }
}
