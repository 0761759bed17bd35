use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Process-wide lifecycle counters
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    pub transitions_committed: AtomicU64,
    pub transitions_rejected: AtomicU64,
    pub commit_conflicts: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_skipped: AtomicU64,
    pub notifications_failed: AtomicU64,
}

impl LifecycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_committed(&self) {
        self.transitions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.transitions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.commit_conflicts.fetch_add(1, Ordering::Relaxed);
        warn!("Aggregate version conflict on commit");
    }

    pub fn record_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.notifications_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> LifecycleStats {
        LifecycleStats {
            transitions_committed: self.transitions_committed.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            commit_conflicts: self.commit_conflicts.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_skipped: self.notifications_skipped.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Lifecycle metrics: committed={}, rejected={}, conflicts={}, sent={}, skipped={}, failed={}",
            stats.transitions_committed,
            stats.transitions_rejected,
            stats.commit_conflicts,
            stats.notifications_sent,
            stats.notifications_skipped,
            stats.notifications_failed
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStats {
    pub transitions_committed: u64,
    pub transitions_rejected: u64,
    pub commit_conflicts: u64,
    pub notifications_sent: u64,
    pub notifications_skipped: u64,
    pub notifications_failed: u64,
}

/// Global metrics instance
static LIFECYCLE_METRICS: std::sync::LazyLock<LifecycleMetrics> =
    std::sync::LazyLock::new(LifecycleMetrics::new);

pub fn lifecycle_metrics() -> &'static LifecycleMetrics {
    &LIFECYCLE_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = LifecycleMetrics::new();
        metrics.record_committed();
        metrics.record_committed();
        metrics.record_rejected();
        metrics.record_failed();
        let stats = metrics.get_stats();
        assert_eq!(stats.transitions_committed, 2);
        assert_eq!(stats.transitions_rejected, 1);
        assert_eq!(stats.notifications_failed, 1);
        assert_eq!(stats.notifications_sent, 0);
    }

    #[test]
    fn test_timer_finishes() {
        let timer = OperationTimer::new("publish");
        timer.finish();
    }
}
