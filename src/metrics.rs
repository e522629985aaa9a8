use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time delivery statistics derived from the recorder state.
///
/// Computed on demand, never stored. `average_latency_ms` covers only the
/// current rolling window, so long-gone samples do not drag the figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    pub total_sent: u64,
    pub total_received: u64,
    pub average_latency_ms: f64,
    /// Receipts per elapsed whole second since start/reset,
    /// 0.0 within the first second
    pub throughput: f64,
    /// Epoch milliseconds of the most recent send or receive, 0 if none
    pub last_message_timestamp: i64,
}

/// One epoch of recorder state, replaced wholesale on reset.
///
/// Counters are atomics so the hot record paths run under the outer read
/// lock without contending with each other; the correlation map and the
/// window each take a short mutex for their compound updates.
struct RecorderState {
    total_sent: AtomicU64,
    total_received: AtomicU64,
    last_message_at: AtomicI64,
    /// Pending correlations: message id -> send timestamp (epoch ms)
    pending: Mutex<HashMap<String, i64>>,
    /// Rolling window of the most recent latency samples, oldest first
    window: Mutex<VecDeque<i64>>,
    started: Instant,
}

impl RecorderState {
    fn new() -> Self {
        Self {
            total_sent: AtomicU64::new(0),
            total_received: AtomicU64::new(0),
            last_message_at: AtomicI64::new(0),
            pending: Mutex::new(HashMap::new()),
            window: Mutex::new(VecDeque::with_capacity(crate::defaults::LATENCY_WINDOW)),
            started: Instant::now(),
        }
    }
}

/// Send/receive correlation and statistics engine.
///
/// Tags outbound messages with their send instant, matches inbound
/// deliveries back to them by id, and keeps a bounded window of latency
/// samples plus monotonic send/receive counters. Safe to call from any
/// number of producer and consumer threads; no operation here can fail.
///
/// Memory is bounded by construction: the latency window holds at most
/// [`crate::defaults::LATENCY_WINDOW`] samples with strict FIFO eviction.
/// The trade is deliberate: older samples fall out of the average rather
/// than the window growing without bound.
pub struct MetricsRecorder {
    // Read lock for every record/snapshot path, write lock only for reset,
    // so a snapshot observes exactly one epoch of state.
    state: RwLock<RecorderState>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RecorderState::new()),
        }
    }

    /// Register a pending correlation for an outbound message.
    ///
    /// Always succeeds. Recording the same id twice overwrites the pending
    /// entry; the later send wins the correlation.
    pub fn record_sent(&self, message_id: &str, sent_at: i64) {
        let state = self.state.read();
        state.total_sent.fetch_add(1, Ordering::Relaxed);
        state.pending.lock().insert(message_id.to_string(), sent_at);
        state.last_message_at.store(sent_at, Ordering::Relaxed);
    }

    /// Record an inbound delivery, resolving its latency when a pending
    /// correlation exists.
    ///
    /// The receive is counted unconditionally. `HashMap::remove` under the
    /// lock consumes the correlation exactly once, so concurrent duplicate
    /// receipts for one id yield at most one latency sample; the losers are
    /// counted but contribute nothing to the window. Samples are signed;
    /// clock skew between the sending and receiving host can produce a
    /// negative latency and the recorder keeps it as observed.
    pub fn record_received(&self, message_id: &str, received_at: i64) {
        let state = self.state.read();
        state.total_received.fetch_add(1, Ordering::Relaxed);

        let sent_at = state.pending.lock().remove(message_id);
        if let Some(sent_at) = sent_at {
            let mut window = state.window.lock();
            // Evict before pushing so the bound holds at every instant
            if window.len() >= crate::defaults::LATENCY_WINDOW {
                window.pop_front();
            }
            window.push_back(received_at - sent_at);
        }

        state.last_message_at.store(received_at, Ordering::Relaxed);
    }

    /// Derive the current statistics snapshot
    pub fn snapshot(&self) -> MessageStats {
        let state = self.state.read();

        let average_latency_ms = {
            let window = state.window.lock();
            if window.is_empty() {
                0.0
            } else {
                window.iter().sum::<i64>() as f64 / window.len() as f64
            }
        };

        let total_received = state.total_received.load(Ordering::Relaxed);
        let elapsed_secs = state.started.elapsed().as_secs();
        let throughput = if elapsed_secs == 0 {
            0.0
        } else {
            total_received as f64 / elapsed_secs as f64
        };

        MessageStats {
            total_sent: state.total_sent.load(Ordering::Relaxed),
            total_received,
            average_latency_ms,
            throughput,
            last_message_timestamp: state.last_message_at.load(Ordering::Relaxed),
        }
    }

    /// Zero the counters, drop the window and all pending correlations, and
    /// restart the throughput clock.
    ///
    /// The whole state is swapped under the write lock, so a concurrent
    /// `snapshot` sees either the old epoch or the new one, never counters
    /// from one paired with a window from the other.
    pub fn reset(&self) {
        *self.state.write() = RecorderState::new();
    }

    /// Current contents of the latency window, oldest first
    pub fn latency_samples(&self) -> Vec<i64> {
        let state = self.state.read();
        let window = state.window.lock();
        window.iter().copied().collect()
    }

    /// Number of sends still awaiting their matching delivery
    pub fn pending_count(&self) -> usize {
        self.state.read().pending.lock().len()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_track_calls() {
        let recorder = MetricsRecorder::new();

        recorder.record_sent("a", 100);
        recorder.record_sent("b", 110);
        recorder.record_received("a", 150);

        let stats = recorder.snapshot();
        assert_eq!(stats.total_sent, 2);
        assert_eq!(stats.total_received, 1);
        assert_eq!(stats.last_message_timestamp, 150);
        assert_eq!(recorder.pending_count(), 1);
    }

    #[test]
    fn test_matched_receive_yields_one_sample() {
        let recorder = MetricsRecorder::new();

        recorder.record_sent("m1", 1_000);
        recorder.record_received("m1", 1_042);
        assert_eq!(recorder.latency_samples(), vec![42]);

        // Duplicate receipt is counted but the correlation is already spent
        recorder.record_received("m1", 1_100);
        assert_eq!(recorder.latency_samples(), vec![42]);
        assert_eq!(recorder.snapshot().total_received, 2);
    }

    #[test]
    fn test_unknown_receive_counts_without_sample() {
        let recorder = MetricsRecorder::new();

        recorder.record_received("ghost", 500);

        let stats = recorder.snapshot();
        assert_eq!(stats.total_received, 1);
        assert_eq!(stats.average_latency_ms, 0.0);
        assert!(recorder.latency_samples().is_empty());
    }

    #[test]
    fn test_resend_overwrites_pending_entry() {
        let recorder = MetricsRecorder::new();

        recorder.record_sent("m1", 1_000);
        recorder.record_sent("m1", 2_000);
        recorder.record_received("m1", 2_050);

        // Latency is measured against the later send
        assert_eq!(recorder.latency_samples(), vec![50]);
    }

    #[test]
    fn test_negative_latency_is_kept() {
        let recorder = MetricsRecorder::new();

        // Receiving clock behind the sending clock
        recorder.record_sent("skewed", 2_000);
        recorder.record_received("skewed", 1_990);

        assert_eq!(recorder.latency_samples(), vec![-10]);
    }

    #[test]
    fn test_window_evicts_oldest_beyond_capacity() {
        let recorder = MetricsRecorder::new();

        for i in 0..(crate::defaults::LATENCY_WINDOW as i64 + 1) {
            let id = format!("m{}", i);
            recorder.record_sent(&id, 0);
            recorder.record_received(&id, i);
        }

        let samples = recorder.latency_samples();
        assert_eq!(samples.len(), crate::defaults::LATENCY_WINDOW);
        // Sample 0 was evicted; 1..=1000 remain in arrival order
        assert_eq!(samples[0], 1);
        assert_eq!(
            *samples.last().unwrap(),
            crate::defaults::LATENCY_WINDOW as i64
        );
    }

    #[test]
    fn test_average_latency() {
        let recorder = MetricsRecorder::new();

        for (i, latency) in [10i64, 20, 30].iter().enumerate() {
            let id = format!("m{}", i);
            recorder.record_sent(&id, 0);
            recorder.record_received(&id, *latency);
        }

        let stats = recorder.snapshot();
        assert!((stats.average_latency_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fresh_snapshot_is_zeroed() {
        let recorder = MetricsRecorder::new();
        let stats = recorder.snapshot();

        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.total_received, 0);
        assert_eq!(stats.average_latency_ms, 0.0);
        assert_eq!(stats.throughput, 0.0);
        assert_eq!(stats.last_message_timestamp, 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let recorder = MetricsRecorder::new();

        recorder.record_sent("a", 100);
        recorder.record_sent("b", 110);
        recorder.record_received("a", 150);
        recorder.reset();

        let stats = recorder.snapshot();
        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.total_received, 0);
        assert_eq!(stats.last_message_timestamp, 0);
        assert_eq!(recorder.pending_count(), 0);
        assert!(recorder.latency_samples().is_empty());

        // Correlations from before the reset no longer resolve
        recorder.record_received("b", 200);
        assert!(recorder.latency_samples().is_empty());
    }

    #[test]
    fn test_concurrent_disjoint_recording_loses_nothing() {
        let recorder = Arc::new(MetricsRecorder::new());
        let threads = 8;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let id = format!("t{}-{}", t, i);
                        recorder.record_sent(&id, i as i64);
                        recorder.record_received(&id, i as i64 + 5);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = recorder.snapshot();
        assert_eq!(stats.total_sent, (threads * per_thread) as u64);
        assert_eq!(stats.total_received, (threads * per_thread) as u64);
        assert_eq!(recorder.pending_count(), 0);
    }

    #[test]
    fn test_reset_is_atomic_against_concurrent_snapshots() {
        use std::sync::atomic::AtomicBool;

        let recorder = Arc::new(MetricsRecorder::new());
        let stop = Arc::new(AtomicBool::new(false));

        // Writers keep feeding matched pairs with a non-zero latency, so any
        // epoch that has samples also has a non-zero average
        let writers: Vec<_> = (0..2)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    let mut i = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        let id = format!("w{}-{}", t, i);
                        recorder.record_sent(&id, 100);
                        recorder.record_received(&id, 150);
                        i += 1;
                    }
                })
            })
            .collect();

        let resetter = {
            let recorder = Arc::clone(&recorder);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    recorder.reset();
                    std::thread::yield_now();
                }
            })
        };

        // A snapshot must see one epoch or the other: zeroed counters paired
        // with a populated window would be a mix of the two
        for _ in 0..5_000 {
            let stats = recorder.snapshot();
            if stats.total_received == 0 {
                assert_eq!(
                    stats.average_latency_ms, 0.0,
                    "snapshot mixed a fresh counter epoch with an old window"
                );
            }
        }

        resetter.join().unwrap();
        stop.store(true, Ordering::Relaxed);
        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_duplicate_receives_consume_once() {
        let recorder = Arc::new(MetricsRecorder::new());
        recorder.record_sent("contested", 1_000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || recorder.record_received("contested", 1_050))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Exactly one receipt matched; all were counted
        assert_eq!(recorder.latency_samples(), vec![50]);
        assert_eq!(recorder.snapshot().total_received, 8);
    }
}
