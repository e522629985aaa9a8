//! # Broker Round-Trip Harness - Demo Binary
//!
//! Stands up the full harness against the in-process loopback transport and
//! runs one bulk round trip:
//!
//! 1. **Initialise logging**: tracing with env-filter, colorised output
//! 2. **Parse arguments**: batch size, template, format, pacing, settle time
//! 3. **Wire the harness**: recorder, delivery log, broadcast hub, consumer
//!    subscription, producer
//! 4. **Dispatch the batch**: cancellable via Ctrl-C during pacing
//! 5. **Settle**: wait for outstanding deliveries to come back
//! 6. **Report**: final stats snapshot, optionally written to a JSON file
//!
//! Against the loopback transport every publish is echoed straight back, so
//! the run exercises the complete send/receive correlation path without a
//! broker.

use anyhow::Result;
use broker_roundtrip::{
    broadcast::{BroadcastHub, Broadcaster},
    cli::Args,
    consumer::{DeliveryLog, MessageConsumer},
    logging,
    metrics::MetricsRecorder,
    producer::MessageProducer,
    results::RunSummary,
    transport::LoopbackTransport,
};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    info!("Broker round-trip harness v{}", broker_roundtrip::VERSION);
    let config = args.harness_config();
    debug!("Configuration: {}", config.describe());

    // Shared singletons: one recorder and one delivery log for the whole run
    let recorder = Arc::new(MetricsRecorder::new());
    let delivery_log = Arc::new(DeliveryLog::new(broker_roundtrip::defaults::DELIVERY_LOG));

    // Observer plumbing: consumer pushes envelopes and stats through the
    // hub; the demo tails the hub at debug level
    let hub = Arc::new(BroadcastHub::new(256));
    let mut observer = hub.observe();
    tokio::spawn(async move {
        while let Ok(update) = observer.recv().await {
            debug!("update [{}]: {}", update.topic, update.payload);
        }
    });
    let broadcaster = Broadcaster::new(hub);

    let transport = Arc::new(LoopbackTransport::new());
    let consumer = Arc::new(MessageConsumer::new(
        Arc::clone(&recorder),
        Arc::clone(&delivery_log),
        broadcaster.clone(),
    ));
    consumer.attach(transport.as_ref());

    let producer = MessageProducer::new(transport, Arc::clone(&recorder), config);

    // Ctrl-C cancels the batch during pacing; already-issued sends still count
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, cancelling bulk send");
            ctrl_c_cancel.cancel();
        }
    });

    broadcaster.push_event("bulk send starting");
    let request = args.bulk_request();
    let report = producer.send_bulk(&request, &cancel).await;

    wait_for_deliveries(&recorder, report.success_count as u64, args.settle).await;
    broadcaster.push_event("run complete");

    let stats = recorder.snapshot();
    info!(
        "Round trip complete: {}/{} sent, {} received, avg latency {:.2}ms, throughput {:.2} msg/s",
        report.success_count,
        report.total_requested,
        stats.total_received,
        stats.average_latency_ms,
        stats.throughput
    );
    if recorder.pending_count() > 0 {
        warn!(
            "{} messages never came back within the settle window",
            recorder.pending_count()
        );
    }

    if let Some(ref output_file) = args.output_file {
        RunSummary::new(report, stats, delivery_log.len()).write_to(output_file)?;
    }

    Ok(())
}

/// Poll the recorder until every successful send has been received back, or
/// the settle window runs out.
///
/// The loopback transport delivers almost immediately; the window mostly
/// matters when pacing spread the batch out or a real transport is slow.
async fn wait_for_deliveries(recorder: &MetricsRecorder, expected: u64, settle: Duration) {
    let deadline = Instant::now() + settle;
    while recorder.snapshot().total_received < expected {
        if Instant::now() >= deadline {
            warn!(
                "Settle window elapsed with {}/{} deliveries",
                recorder.snapshot().total_received,
                expected
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
