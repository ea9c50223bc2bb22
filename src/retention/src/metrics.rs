//! Retention Metrics
//!
//! Thread-safe counters for monitoring retention runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Thread-safe metrics for tracking retention runs
#[derive(Debug, Clone)]
pub struct RetentionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Number of runs started
    runs: AtomicUsize,
    /// Total number of snapshot identifiers listed
    snapshots_listed: AtomicUsize,
    /// Total number of snapshots kept by the policy
    snapshots_kept: AtomicUsize,
    /// Total number of snapshots deleted (or that would be, in dry-run)
    snapshots_deleted: AtomicUsize,
    /// Total number of invalid identifiers seen
    invalid_ids: AtomicUsize,
    /// Total number of failed snapshot deletions
    deletion_failures: AtomicUsize,
    /// Total number of objects removed
    objects_deleted: AtomicU64,
    /// Total duration in milliseconds
    total_duration_ms: AtomicU64,
}

impl Default for RetentionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionMetrics {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub fn record_run(&self) {
        self.inner.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshots_listed(&self, count: usize) {
        self.inner
            .snapshots_listed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_snapshots_kept(&self, count: usize) {
        self.inner.snapshots_kept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_snapshot_deleted(&self, objects: u64) {
        self.inner.snapshots_deleted.fetch_add(1, Ordering::Relaxed);
        self.inner
            .objects_deleted
            .fetch_add(objects, Ordering::Relaxed);
    }

    pub fn record_invalid_ids(&self, count: usize) {
        self.inner.invalid_ids.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_deletion_failure(&self) {
        self.inner
            .deletion_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duration_ms(&self, duration_ms: u64) {
        self.inner
            .total_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::Relaxed)
    }

    pub fn snapshots_listed(&self) -> usize {
        self.inner.snapshots_listed.load(Ordering::Relaxed)
    }

    pub fn snapshots_kept(&self) -> usize {
        self.inner.snapshots_kept.load(Ordering::Relaxed)
    }

    pub fn snapshots_deleted(&self) -> usize {
        self.inner.snapshots_deleted.load(Ordering::Relaxed)
    }

    pub fn invalid_ids(&self) -> usize {
        self.inner.invalid_ids.load(Ordering::Relaxed)
    }

    pub fn deletion_failures(&self) -> usize {
        self.inner.deletion_failures.load(Ordering::Relaxed)
    }

    pub fn objects_deleted(&self) -> u64 {
        self.inner.objects_deleted.load(Ordering::Relaxed)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.inner.total_duration_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = RetentionMetrics::new();
        assert_eq!(metrics.runs(), 0);
        assert_eq!(metrics.snapshots_listed(), 0);
        assert_eq!(metrics.snapshots_deleted(), 0);
        assert_eq!(metrics.objects_deleted(), 0);
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = RetentionMetrics::new();

        metrics.record_run();
        assert_eq!(metrics.runs(), 1);

        metrics.record_snapshots_listed(10);
        assert_eq!(metrics.snapshots_listed(), 10);

        metrics.record_snapshots_kept(4);
        assert_eq!(metrics.snapshots_kept(), 4);

        metrics.record_snapshot_deleted(12);
        metrics.record_snapshot_deleted(3);
        assert_eq!(metrics.snapshots_deleted(), 2);
        assert_eq!(metrics.objects_deleted(), 15);

        metrics.record_invalid_ids(2);
        assert_eq!(metrics.invalid_ids(), 2);

        metrics.record_deletion_failure();
        assert_eq!(metrics.deletion_failures(), 1);

        metrics.record_duration_ms(1500);
        assert_eq!(metrics.total_duration_ms(), 1500);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RetentionMetrics::new();
        let clone = metrics.clone();
        clone.record_run();
        assert_eq!(metrics.runs(), 1);
    }
}
