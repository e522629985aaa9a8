use crate::config::HarnessConfig;
use crate::message::{BulkSendReport, BulkSendRequest, Envelope, SendOutcome};
use crate::metrics::MetricsRecorder;
use crate::transport::Transport;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Send side of the harness.
///
/// Assigns each outbound envelope its identity and send timestamp, hands it
/// to the transport, and reports the send to the recorder. Publish failures
/// are absorbed into the returned outcome; nothing here raises beyond the
/// transport boundary.
pub struct MessageProducer {
    transport: Arc<dyn Transport>,
    recorder: Arc<MetricsRecorder>,
    config: HarnessConfig,
}

impl MessageProducer {
    pub fn new(
        transport: Arc<dyn Transport>,
        recorder: Arc<MetricsRecorder>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            transport,
            recorder,
            config,
        }
    }

    /// Send one envelope.
    ///
    /// Identity and `sent_at` are assigned here, exactly once. The send is
    /// recorded only after the transport accepted the publish, so a failed
    /// publish leaves no dangling correlation.
    pub async fn send(&self, mut envelope: Envelope) -> SendOutcome {
        let message_id = Uuid::new_v4().to_string();
        envelope.id = message_id.clone();
        envelope.sent_at = Utc::now().timestamp_millis();

        let destination = envelope
            .destination
            .clone()
            .unwrap_or_else(|| self.config.default_destination.clone());

        match self
            .transport
            .publish(&destination, &self.config.routing_key, &envelope)
            .await
        {
            Ok(()) => {
                self.recorder.record_sent(&message_id, envelope.sent_at);
                debug!("message sent: {}", message_id);
                SendOutcome::succeeded(message_id, envelope.sent_at)
            }
            Err(e) => {
                error!("failed to send message '{}': {}", envelope.content, e);
                SendOutcome::failed()
            }
        }
    }

    /// Issue a batch of sends, optionally paced, and aggregate the result.
    ///
    /// Each iteration expands the literal `{index}` placeholder in the
    /// template with the iteration number and delegates to [`send`]; a
    /// template without the placeholder is sent as-is for every message.
    /// Publish failures are counted, never abort the loop. When pacing is
    /// requested, cancellation during the pause ends the loop early; the
    /// iterations never attempted are charged to neither counter, so a
    /// cancelled run still returns a consistent report for the work done.
    ///
    /// [`send`]: MessageProducer::send
    pub async fn send_bulk(
        &self,
        request: &BulkSendRequest,
        cancel: &CancellationToken,
    ) -> BulkSendReport {
        if request.count == 0 {
            return BulkSendReport::compute(0, 0, 0, 0);
        }

        info!("starting bulk send: {} messages", request.count);
        let started = Instant::now();
        let mut success_count = 0;
        let mut fail_count = 0;

        for i in 0..request.count {
            let content = request.template.replace("{index}", &i.to_string());
            let envelope = Envelope::new(content, request.format);

            let outcome = self.send(envelope).await;
            if outcome.success {
                success_count += 1;
            } else {
                fail_count += 1;
            }

            if request.delay_ms > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(
                            "bulk send cancelled after {} of {} messages",
                            i + 1,
                            request.count
                        );
                        break;
                    }
                    _ = sleep(Duration::from_millis(request.delay_ms)) => {}
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let report =
            BulkSendReport::compute(request.count, success_count, fail_count, duration_ms);
        info!(
            "bulk send completed: {} success, {} failed, duration: {}ms, throughput: {:.2} msg/s",
            report.success_count, report.fail_count, report.duration_ms, report.throughput
        );
        report
    }
}
