use anyhow::Result;
use broker_roundtrip::{
    config::HarnessConfig,
    message::{BulkSendRequest, MessageFormat},
    metrics::MetricsRecorder,
    producer::MessageProducer,
    transport::LoopbackTransport,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn build_producer() -> (MessageProducer, Arc<MetricsRecorder>) {
    let recorder = Arc::new(MetricsRecorder::new());
    let producer = MessageProducer::new(
        Arc::new(LoopbackTransport::new()),
        Arc::clone(&recorder),
        HarnessConfig::default(),
    );
    (producer, recorder)
}

/// A paced batch actually paces: three messages with a 50ms gap take at
/// least the two inter-message delays.
#[tokio::test]
async fn paced_batch_takes_the_delays() -> Result<()> {
    let (producer, _) = build_producer();

    let request = BulkSendRequest {
        count: 3,
        template: "paced-{index}".to_string(),
        format: MessageFormat::Text,
        delay_ms: 50,
    };

    let started = Instant::now();
    let report = producer.send_bulk(&request, &CancellationToken::new()).await;

    assert_eq!(report.success_count, 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(report.duration_ms >= 100);

    Ok(())
}

/// Cancellation during the pacing pause ends the batch promptly and the
/// report stays consistent for the work actually attempted.
#[tokio::test]
async fn cancelled_batch_reports_partial_work() -> Result<()> {
    let (producer, recorder) = build_producer();

    let request = BulkSendRequest {
        count: 1_000,
        template: "slow-{index}".to_string(),
        format: MessageFormat::Text,
        delay_ms: 100,
    };

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let report = producer.send_bulk(&request, &cancel).await;

    // Well short of the 100 seconds a full run would take
    assert!(started.elapsed() < Duration::from_secs(2));

    let attempted = report.success_count + report.fail_count;
    assert!(attempted >= 1 && attempted < 1_000);
    assert_eq!(report.fail_count, 0);
    assert_eq!(report.total_requested, 1_000);

    // Every attempted send was recorded, nothing more
    assert_eq!(recorder.snapshot().total_sent, attempted as u64);

    Ok(())
}

/// A pre-cancelled token stops the batch at the first pacing pause, not
/// before the first send.
#[tokio::test]
async fn pre_cancelled_batch_attempts_one_send() -> Result<()> {
    let (producer, _) = build_producer();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = BulkSendRequest {
        count: 100,
        template: "x".to_string(),
        format: MessageFormat::Text,
        delay_ms: 50,
    };
    let report = producer.send_bulk(&request, &cancel).await;

    assert_eq!(report.success_count, 1);
    assert_eq!(report.fail_count, 0);

    Ok(())
}
