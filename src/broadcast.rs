use crate::message::Envelope;
use crate::metrics::MessageStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Topics observers can subscribe to
pub mod topics {
    /// Every envelope that completed its round trip
    pub const MESSAGES: &str = "messages";
    /// A fresh statistics snapshot after each delivery
    pub const STATS: &str = "stats";
    /// Plain event strings (lifecycle notices)
    pub const EVENTS: &str = "events";
}

/// Fire-and-forget push boundary toward external observers.
///
/// Implementations may be flaky (a WebSocket session going away mid-push is
/// normal); callers go through [`Broadcaster`], which swallows and logs any
/// error so observer trouble never reaches the metrics core.
pub trait UpdateSink: Send + Sync {
    fn publish_update(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

/// One pushed update as observers see it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Best-effort wrapper over an [`UpdateSink`].
///
/// Serialization or sink failures are logged and dropped; none of these
/// methods can fail from the caller's point of view.
#[derive(Clone)]
pub struct Broadcaster {
    sink: Arc<dyn UpdateSink>,
}

impl Broadcaster {
    pub fn new(sink: Arc<dyn UpdateSink>) -> Self {
        Self { sink }
    }

    /// Push a round-tripped envelope to the `messages` topic
    pub fn push_envelope(&self, envelope: &Envelope) {
        self.push(topics::MESSAGES, envelope);
    }

    /// Push a statistics snapshot to the `stats` topic
    pub fn push_stats(&self, stats: &MessageStats) {
        self.push(topics::STATS, stats);
    }

    /// Push a plain event string to the `events` topic
    pub fn push_event(&self, event: &str) {
        self.push(topics::EVENTS, &event);
    }

    fn push<T: Serialize>(&self, topic: &str, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize update for topic {}: {}", topic, e);
                return;
            }
        };
        if let Err(e) = self.sink.publish_update(topic, payload) {
            error!("failed to push update to topic {}: {}", topic, e);
        }
    }
}

/// Tokio broadcast-channel sink: fans updates out to in-process observers.
///
/// Stands in for the WebSocket layer at the boundary the harness actually
/// depends on. With no observers attached, updates are dropped silently;
/// that is the fire-and-forget contract, not an error.
pub struct BroadcastHub {
    tx: broadcast::Sender<Update>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach an observer; slow observers lag and lose old updates rather
    /// than backpressure the delivery path
    pub fn observe(&self) -> broadcast::Receiver<Update> {
        self.tx.subscribe()
    }
}

impl UpdateSink for BroadcastHub {
    fn publish_update(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let update = Update {
            topic: topic.to_string(),
            payload,
        };
        // send only errors when nobody is subscribed
        if self.tx.send(update).is_err() {
            debug!("no observers for topic {}, update dropped", topic);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageFormat;
    use anyhow::anyhow;

    struct FailingSink;

    impl UpdateSink for FailingSink {
        fn publish_update(&self, _topic: &str, _payload: serde_json::Value) -> Result<()> {
            Err(anyhow!("sink unavailable"))
        }
    }

    #[test]
    fn test_broadcaster_swallows_sink_failure() {
        let broadcaster = Broadcaster::new(Arc::new(FailingSink));

        // Must not panic or propagate
        broadcaster.push_event("started");
        broadcaster.push_envelope(&Envelope::new("x", MessageFormat::Text));
    }

    #[tokio::test]
    async fn test_hub_delivers_to_observer() {
        let hub = Arc::new(BroadcastHub::new(16));
        let mut rx = hub.observe();

        let broadcaster = Broadcaster::new(hub);
        broadcaster.push_event("bulk send started");

        let update = rx.recv().await.unwrap();
        assert_eq!(update.topic, topics::EVENTS);
        assert_eq!(update.payload, serde_json::json!("bulk send started"));
    }

    #[tokio::test]
    async fn test_hub_without_observers_is_silent() {
        let hub = BroadcastHub::new(16);
        assert!(hub
            .publish_update(topics::STATS, serde_json::json!({}))
            .is_ok());
    }
}
