use crate::broadcast::Broadcaster;
use crate::message::Envelope;
use crate::metrics::MetricsRecorder;
use crate::transport::Transport;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Bounded FIFO of the most recently received envelopes.
///
/// Capacity-bounded with strict oldest-first eviction, so the log never
/// grows past its capacity no matter how long the harness runs. Safe for
/// concurrent appends and reads; an append that was not itself evicted is
/// never lost to a reader.
pub struct DeliveryLog {
    entries: Mutex<VecDeque<Envelope>>,
    capacity: usize,
}

impl DeliveryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append to the tail, evicting the head when full
    pub fn append(&self, envelope: Envelope) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(envelope);
    }

    /// Up to `limit` retained envelopes in arrival order, oldest first
    pub fn list(&self, limit: usize) -> Vec<Envelope> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Receive side of the harness.
///
/// Runs as the transport's delivery callback: stamps the arrival time,
/// resolves the latency through the recorder, retains the envelope in the
/// delivery log, and pushes the envelope plus a fresh stats snapshot to
/// observers. The transport may invoke it from any task or thread,
/// concurrently with the producer.
pub struct MessageConsumer {
    recorder: Arc<MetricsRecorder>,
    log: Arc<DeliveryLog>,
    broadcaster: Broadcaster,
}

impl MessageConsumer {
    pub fn new(
        recorder: Arc<MetricsRecorder>,
        log: Arc<DeliveryLog>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            recorder,
            log,
            broadcaster,
        }
    }

    /// Register this consumer as the transport's delivery handler
    pub fn attach(self: Arc<Self>, transport: &dyn Transport) {
        transport.subscribe(Arc::new(move |envelope| {
            self.handle_delivery(envelope);
        }));
    }

    /// Process one inbound delivery.
    ///
    /// `received_at` is stamped here, once; the envelope stored and
    /// broadcast downstream carries both timestamps.
    pub fn handle_delivery(&self, mut envelope: Envelope) {
        let received_at = Utc::now().timestamp_millis();
        envelope.received_at = Some(received_at);

        debug!("message received: {}", envelope.id);

        self.recorder.record_received(&envelope.id, received_at);
        self.log.append(envelope.clone());

        self.broadcaster.push_envelope(&envelope);
        self.broadcaster.push_stats(&self.recorder.snapshot());
    }
}
