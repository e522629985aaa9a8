use crate::message::Envelope;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Callback invoked by a transport for every inbound delivery.
///
/// The transport calls this from whatever task or thread its subscription
/// runs on; implementations must be safe under concurrent invocation.
pub type DeliveryHandler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Failure surfaced by a publish attempt.
///
/// The harness treats any of these as a failed send and moves on; retry
/// policy belongs to the caller, not the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("publish to '{destination}' rejected: {reason}")]
    PublishRejected {
        destination: String,
        reason: String,
    },
    #[error("transport is closed")]
    Closed,
}

/// Broker client boundary: one-shot publish plus a push-style subscription.
///
/// Connection setup, provisioning, and delivery ordering all live behind
/// this trait. The harness only publishes envelopes and reacts to the
/// deliveries the transport pushes back at it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish one envelope to a destination under a routing key
    async fn publish(
        &self,
        destination: &str,
        key: &str,
        envelope: &Envelope,
    ) -> Result<(), TransportError>;

    /// Register a handler for inbound deliveries.
    ///
    /// Handlers registered later still see later deliveries; earlier
    /// deliveries are not replayed.
    fn subscribe(&self, handler: DeliveryHandler);

    /// Transport name for identification
    fn name(&self) -> &'static str;
}

/// In-process broker stand-in that echoes every published envelope back to
/// the registered subscribers.
///
/// Published envelopes go through an mpsc channel and are delivered from a
/// dispatcher task, so the receive path runs on a different task than the
/// publish path, the same shape as a real broker's delivery callback.
/// Used by the demo binary and the integration tests; not a broker client.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<Envelope>,
    handlers: Arc<RwLock<Vec<DeliveryHandler>>>,
}

impl LoopbackTransport {
    /// Create the transport and spawn its dispatcher task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let handlers: Arc<RwLock<Vec<DeliveryHandler>>> = Arc::new(RwLock::new(Vec::new()));

        let dispatch_handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let current: Vec<DeliveryHandler> =
                    dispatch_handlers.read().iter().cloned().collect();
                if current.is_empty() {
                    warn!("loopback delivery dropped, no subscribers: {}", envelope.id);
                    continue;
                }
                for handler in current {
                    handler(envelope.clone());
                }
            }
            debug!("loopback dispatcher stopped");
        });

        Self { tx, handlers }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn publish(
        &self,
        destination: &str,
        key: &str,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        debug!(
            "loopback publish to {} (key {}): {}",
            destination, key, envelope.id
        );
        self.tx
            .send(envelope.clone())
            .map_err(|_| TransportError::Closed)
    }

    fn subscribe(&self, handler: DeliveryHandler) {
        self.handlers.write().push(handler);
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}
