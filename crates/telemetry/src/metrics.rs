//! Run metrics collection.
//!
//! Counters and latency histograms are kept in memory and logged as a
//! snapshot at the end of each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 50, 100, 500, 1000, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let last = Self::BUCKET_BOUNDS.len() - 1;
        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(last);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the sessionizer.
#[derive(Debug, Default)]
pub struct Metrics {
    // Source metrics
    pub events_fetched: Counter,
    pub fetch_errors: Counter,

    // Sessionization metrics
    pub visitors_processed: Counter,
    pub sessions_computed: Counter,

    // Sink metrics
    pub delivery_attempts: Counter,
    pub delivery_errors: Counter,
    pub runs_completed: Counter,

    // Latency histograms
    pub fetch_latency_ms: Histogram,
    pub compute_latency_ms: Histogram,
    pub delivery_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_fetched: u64,
    pub fetch_errors: u64,
    pub visitors_processed: u64,
    pub sessions_computed: u64,
    pub delivery_attempts: u64,
    pub delivery_errors: u64,
    pub runs_completed: u64,
    pub fetch_latency_mean_ms: f64,
    pub compute_latency_mean_ms: f64,
    pub delivery_latency_mean_ms: f64,
    /// `(upper bound ms, count)` pairs
    pub delivery_latency_buckets: Vec<(u64, u64)>,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_fetched: self.events_fetched.get(),
            fetch_errors: self.fetch_errors.get(),
            visitors_processed: self.visitors_processed.get(),
            sessions_computed: self.sessions_computed.get(),
            delivery_attempts: self.delivery_attempts.get(),
            delivery_errors: self.delivery_errors.get(),
            runs_completed: self.runs_completed.get(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            compute_latency_mean_ms: self.compute_latency_ms.mean(),
            delivery_latency_mean_ms: self.delivery_latency_ms.mean(),
            delivery_latency_buckets: self.delivery_latency_ms.buckets(),
        }
    }

    /// Logs the current snapshot at info level.
    pub fn log_snapshot(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => tracing::info!(metrics = %json, "Run metrics"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize run metrics"),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
