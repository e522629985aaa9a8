use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Content encoding of an envelope payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageFormat {
    /// Plain text payload
    #[clap(name = "text")]
    Text,
    /// JSON payload (opaque to the harness, parsed only by observers)
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageFormat::Text => write!(f, "TEXT"),
            MessageFormat::Json => write!(f, "JSON"),
        }
    }
}

/// One message instance with identity, payload, and timing metadata.
///
/// The identity (`id`) and `sent_at` are assigned exactly once, by the
/// producer at publish time. `received_at` is stamped exactly once, by the
/// consumer when the matching delivery arrives; it stays `None` for envelopes
/// that never make it back. The harness does not assume
/// `received_at >= sent_at` because the two stamps can come from different
/// clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message identifier, empty until the envelope is sent
    #[serde(default)]
    pub id: String,
    /// Opaque payload text
    pub content: String,
    /// Payload encoding
    pub format: MessageFormat,
    /// Target topic/queue; the producer substitutes the harness default when unset
    #[serde(default)]
    pub destination: Option<String>,
    /// Epoch milliseconds at send time, 0 until the envelope is sent
    #[serde(default)]
    pub sent_at: i64,
    /// Epoch milliseconds at receive time, if the delivery came back
    #[serde(default)]
    pub received_at: Option<i64>,
}

impl Envelope {
    /// Create an unsent envelope carrying the given payload.
    ///
    /// Identity and `sent_at` stay unset here; the producer stamps both,
    /// exactly once, at publish time.
    pub fn new(content: impl Into<String>, format: MessageFormat) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            format,
            destination: None,
            sent_at: 0,
            received_at: None,
        }
    }

    /// Set an explicit destination, overriding the harness default
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Outcome of a single send attempt.
///
/// A failed publish reports `success = false` with no identifier; the
/// producer never retries on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub message_id: Option<String>,
    pub timestamp: i64,
    pub success: bool,
}

impl SendOutcome {
    pub fn succeeded(message_id: String, timestamp: i64) -> Self {
        Self {
            message_id: Some(message_id),
            timestamp,
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            message_id: None,
            timestamp: Utc::now().timestamp_millis(),
            success: false,
        }
    }
}

/// Parameters for one bulk dispatch batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendRequest {
    /// Number of messages to issue
    pub count: usize,
    /// Content template; the literal `{index}` expands to the iteration number
    pub template: String,
    /// Payload encoding for every message in the batch
    pub format: MessageFormat,
    /// Pause between iterations in milliseconds, 0 for no pacing
    pub delay_ms: u64,
}

impl BulkSendRequest {
    /// Unpaced text batch
    pub fn new(count: usize, template: impl Into<String>) -> Self {
        Self {
            count,
            template: template.into(),
            format: MessageFormat::Text,
            delay_ms: 0,
        }
    }
}

/// Aggregate result of a bulk dispatch.
///
/// `total_requested` reflects the request, not the attempts: a cancelled run
/// reports fewer `success_count + fail_count` than `total_requested` without
/// charging the unattempted iterations to either counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSendReport {
    pub total_requested: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub duration_ms: u64,
    /// Successful sends per second over the batch wall-clock time,
    /// 0.0 for an instantaneous batch
    pub throughput: f64,
}

impl BulkSendReport {
    pub(crate) fn compute(
        total_requested: usize,
        success_count: usize,
        fail_count: usize,
        duration_ms: u64,
    ) -> Self {
        let throughput = if duration_ms > 0 {
            (success_count as f64 * 1000.0) / duration_ms as f64
        } else {
            0.0
        };
        Self {
            total_requested,
            success_count,
            fail_count,
            duration_ms,
            throughput,
        }
    }
}
