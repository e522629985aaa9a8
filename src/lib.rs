//! # Broker Round-Trip Harness
//!
//! A demonstration harness for message-broker producer/consumer round
//! trips: it publishes messages to a broker, receives them back through a
//! subscription, and reports delivery statistics (latency, throughput) to
//! observers.
//!
//! ## Architecture Overview
//!
//! The harness is organised around a small set of modules:
//!
//! - `message`: The `Envelope` identity/timing model plus the send and bulk
//!   request/report types
//! - `metrics`: The correlation and statistics engine - pairs each inbound
//!   delivery with the send that produced it and maintains a bounded
//!   rolling window of latency samples
//! - `producer`: Single and bulk send paths, with cancellable pacing for
//!   bulk batches
//! - `consumer`: The delivery callback - stamps arrivals, records them, and
//!   retains recent envelopes in a bounded delivery log
//! - `transport`: The broker-client boundary (`Transport` trait) and an
//!   in-process loopback implementation for broker-free runs
//! - `broadcast`: Fire-and-forget push of envelopes, stats, and events to
//!   interested observers
//! - `config` / `cli` / `logging`: Harness configuration, argument parsing,
//!   and tracing setup for the demo binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use broker_roundtrip::{
//!     broadcast::{BroadcastHub, Broadcaster},
//!     config::HarnessConfig,
//!     consumer::{DeliveryLog, MessageConsumer},
//!     message::BulkSendRequest,
//!     metrics::MetricsRecorder,
//!     producer::MessageProducer,
//!     transport::LoopbackTransport,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(LoopbackTransport::new());
//!     let recorder = Arc::new(MetricsRecorder::new());
//!     let log = Arc::new(DeliveryLog::new(broker_roundtrip::defaults::DELIVERY_LOG));
//!     let broadcaster = Broadcaster::new(Arc::new(BroadcastHub::new(64)));
//!
//!     let consumer = Arc::new(MessageConsumer::new(
//!         Arc::clone(&recorder),
//!         Arc::clone(&log),
//!         broadcaster,
//!     ));
//!     consumer.attach(transport.as_ref());
//!
//!     let producer =
//!         MessageProducer::new(transport, Arc::clone(&recorder), HarnessConfig::default());
//!     let report = producer
//!         .send_bulk(&BulkSendRequest::new(5, "msg-{index}"), &CancellationToken::new())
//!         .await;
//!
//!     println!("sent {} ok, stats: {:?}", report.success_count, recorder.snapshot());
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! The recorder and the delivery log are process-wide singletons shared
//! across producer and consumer paths; every mutating operation is safe
//! under concurrent invocation without external locking. Memory is bounded
//! by construction: the latency window and the delivery log both evict
//! their oldest entry, FIFO, once at capacity. No state survives a process
//! restart.

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod producer;
pub mod results;
pub mod transport;

pub use broadcast::{BroadcastHub, Broadcaster, UpdateSink};
pub use cli::Args;
pub use config::HarnessConfig;
pub use consumer::{DeliveryLog, MessageConsumer};
pub use message::{BulkSendReport, BulkSendRequest, Envelope, MessageFormat, SendOutcome};
pub use metrics::{MessageStats, MetricsRecorder};
pub use producer::MessageProducer;
pub use results::RunSummary;
pub use transport::{LoopbackTransport, Transport, TransportError};

/// The current version of the harness, populated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Maximum number of latency samples kept in the rolling window.
    ///
    /// Once full, each new sample evicts the oldest one. The average is
    /// therefore an approximation over recent traffic, by design; the bound
    /// keeps a long-running harness at constant memory.
    pub const LATENCY_WINDOW: usize = 1000;

    /// Maximum number of received envelopes retained for inspection.
    ///
    /// Same FIFO eviction discipline as the latency window.
    pub const DELIVERY_LOG: usize = 1000;

    /// Default number of messages in a demo bulk batch
    pub const BULK_COUNT: usize = 10;

    /// Default content template for demo batches
    pub const BULK_TEMPLATE: &str = "message-{index}";
}
