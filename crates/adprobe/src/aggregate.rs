//! Outcome accounting.
//!
//! Every iteration ends in exactly one [`Outcome`], and every outcome is
//! recorded exactly once. Counters are atomics so workers never wait on each
//! other for the common path; latency and per-shape detail sit behind a
//! short-held lock.

use crate::transport::TransportErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Why an iteration failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// A response arrived but the checker rejected it
    UnexpectedStatus {
        /// Received status
        status: u16,
    },
    /// No response
    Transport {
        /// Failure class
        kind: TransportErrorKind,
    },
}

/// Terminal classification of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Response met expectations
    Passed,
    /// Response missing or rejected
    Failed {
        /// Failure detail
        reason: FailureReason,
    },
    /// Cancelled at the drain deadline while in flight
    Aborted,
}

/// Result of a single iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Variant shape that was requested
    pub shape: String,
    /// Requested URL
    pub url: String,
    /// Status code, if a response arrived
    pub status: Option<u16>,
    /// Time from send to full response (or error)
    pub latency: Duration,
    /// Classification
    pub kind: OutcomeKind,
}

impl Outcome {
    /// Whether the iteration passed
    pub fn is_passed(&self) -> bool {
        self.kind == OutcomeKind::Passed
    }
}

// =============================================================================
// Latency histogram
// =============================================================================

/// Latency histogram with fixed-size millisecond buckets.
///
/// Samples past the last bucket land in the last bucket; `max` stays exact.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    buckets: Vec<u64>,
    bucket_ms: u64,
    count: u64,
    sum_ms: u64,
    min_ms: u64,
    max_ms: u64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        // 1ms resolution up to 60s
        Self::new(1, 60_000)
    }
}

impl LatencyHistogram {
    /// Histogram with `buckets` buckets of `bucket_ms` each
    pub fn new(bucket_ms: u64, buckets: usize) -> Self {
        Self {
            buckets: vec![0; buckets.max(1)],
            bucket_ms: bucket_ms.max(1),
            count: 0,
            sum_ms: 0,
            min_ms: u64::MAX,
            max_ms: 0,
        }
    }

    /// Record one sample
    pub fn record(&mut self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        let last = self.buckets.len() - 1;
        let index = usize::try_from(ms / self.bucket_ms).map_or(last, |i| i.min(last));
        self.buckets[index] += 1;
        self.count += 1;
        self.sum_ms = self.sum_ms.saturating_add(ms);
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Lower edge (ms) of the bucket holding the `p`th percentile
    pub fn percentile(&self, p: u8) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let target = ((f64::from(p) / 100.0) * self.count as f64).ceil().max(1.0) as u64;
        let last = self.buckets.len() - 1;
        let mut cumulative = 0u64;
        for (i, &count) in self.buckets.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                if i == last {
                    return self.max_ms;
                }
                return i as u64 * self.bucket_ms;
            }
        }
        self.max_ms
    }

    /// Mean latency in ms
    pub fn mean(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.sum_ms / self.count
        }
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Smallest sample in ms
    pub fn min(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.min_ms
        }
    }

    /// Largest sample in ms
    pub fn max(&self) -> u64 {
        self.max_ms
    }

    /// Summary for reports
    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            min_ms: self.min(),
            mean_ms: self.mean(),
            p50_ms: self.percentile(50),
            p95_ms: self.percentile(95),
            p99_ms: self.percentile(99),
            max_ms: self.max(),
        }
    }
}

/// Latency figures, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Fastest response
    pub min_ms: u64,
    /// Mean
    pub mean_ms: u64,
    /// Median
    pub p50_ms: u64,
    /// 95th percentile
    pub p95_ms: u64,
    /// 99th percentile
    pub p99_ms: u64,
    /// Slowest response
    pub max_ms: u64,
}

// =============================================================================
// Aggregate
// =============================================================================

/// Per-shape counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStats {
    /// Completed iterations of this shape
    pub count: u64,
    /// Of which failed
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Detail {
    latency: LatencyHistogram,
    shapes: BTreeMap<String, ShapeStats>,
}

/// Thread-safe outcome counters shared by every worker
#[derive(Debug, Default)]
pub struct Aggregate {
    total: AtomicU64,
    passed: AtomicU64,
    failed_status: AtomicU64,
    failed_connection: AtomicU64,
    failed_timeout: AtomicU64,
    failed_other: AtomicU64,
    aborted: AtomicU64,
    detail: Mutex<Detail>,
}

impl Aggregate {
    /// Empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed iteration
    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome.kind {
            OutcomeKind::Passed => &self.passed,
            OutcomeKind::Failed {
                reason: FailureReason::UnexpectedStatus { .. },
            } => &self.failed_status,
            OutcomeKind::Failed {
                reason: FailureReason::Transport { kind },
            } => match kind {
                TransportErrorKind::Connection => &self.failed_connection,
                TransportErrorKind::Timeout => &self.failed_timeout,
                TransportErrorKind::Other => &self.failed_other,
            },
            OutcomeKind::Aborted => {
                self.record_aborted();
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut detail = self.detail.lock().unwrap_or_else(PoisonError::into_inner);
        detail.latency.record(outcome.latency);
        let shape = detail.shapes.entry(outcome.shape.clone()).or_default();
        shape.count += 1;
        if !outcome.is_passed() {
            shape.failed += 1;
        }
    }

    /// Record an iteration cancelled at the drain deadline
    pub fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Iterations recorded so far, aborted included
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> AggregateSnapshot {
        let detail = self.detail.lock().unwrap_or_else(PoisonError::into_inner);
        AggregateSnapshot {
            total: self.total.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            failed_status: self.failed_status.load(Ordering::Relaxed),
            failed_connection: self.failed_connection.load(Ordering::Relaxed),
            failed_timeout: self.failed_timeout.load(Ordering::Relaxed),
            failed_other: self.failed_other.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            latency: detail.latency.summary(),
            shapes: detail.shapes.clone(),
        }
    }
}

/// Counters at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// All recorded iterations, aborted included
    pub total: u64,
    /// Passed the check
    pub passed: u64,
    /// Response rejected by the check
    pub failed_status: u64,
    /// Could not connect
    pub failed_connection: u64,
    /// Request timed out
    pub failed_timeout: u64,
    /// Other transport failure
    pub failed_other: u64,
    /// Cancelled at the drain deadline
    pub aborted: u64,
    /// Latency over completed iterations
    pub latency: LatencySummary,
    /// Completed iterations per variant shape
    pub shapes: BTreeMap<String, ShapeStats>,
}

impl AggregateSnapshot {
    /// All failures
    pub fn failed(&self) -> u64 {
        self.failed_status + self.failed_connection + self.failed_timeout + self.failed_other
    }

    /// Iterations that ran to completion
    pub fn completed(&self) -> u64 {
        self.passed + self.failed()
    }

    /// Passed share of completed iterations, in percent
    pub fn pass_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            0.0
        } else {
            (self.passed as f64 / completed as f64) * 100.0
        }
    }
}
