use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for one fragment map computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetrics {
    /// Window starts handed to the worker pool
    pub starts_dispatched: u64,
    /// Starts that produced a segment
    pub starts_completed: u64,
    /// Starts without any window length that fits the sequence
    pub starts_empty: u64,
    /// Single-window searches performed
    pub windows_searched: u64,
    /// Searches that returned an error
    pub search_failures: u64,
    /// Starts abandoned because the computation was cancelled
    pub starts_cancelled: u64,
    /// Wall time since the collector was created
    pub elapsed: Duration,
}

impl SearchMetrics {
    /// Calculate windows searched per second
    pub fn windows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.windows_searched as f64 / self.elapsed.as_secs_f64()
        }
    }
}

/// Thread-safe metrics collector shared by the dispatcher and all workers
#[derive(Debug)]
pub struct MetricsCollector {
    starts_dispatched: AtomicU64,
    starts_completed: AtomicU64,
    starts_empty: AtomicU64,
    windows_searched: AtomicU64,
    search_failures: AtomicU64,
    starts_cancelled: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            starts_dispatched: AtomicU64::new(0),
            starts_completed: AtomicU64::new(0),
            starts_empty: AtomicU64::new(0),
            windows_searched: AtomicU64::new(0),
            search_failures: AtomicU64::new(0),
            starts_cancelled: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_dispatch(&self) {
        self.starts_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.starts_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self) {
        self.starts_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window(&self) {
        self.windows_searched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.search_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.starts_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the current counters
    pub fn get_metrics(&self) -> SearchMetrics {
        SearchMetrics {
            starts_dispatched: self.starts_dispatched.load(Ordering::Relaxed),
            starts_completed: self.starts_completed.load(Ordering::Relaxed),
            starts_empty: self.starts_empty.load(Ordering::Relaxed),
            windows_searched: self.windows_searched.load(Ordering::Relaxed),
            search_failures: self.search_failures.load(Ordering::Relaxed),
            starts_cancelled: self.starts_cancelled.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
