//! Lock-free pool metrics.
//!
//! Counters are only ever touched through atomic operations, so any task
//! may record or read them at any time. `processed` and `failed` are
//! individually linearizable but not updated as a pair; a reader can
//! observe a state where neither reflects the most recent job.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Shared counters for a single pool run.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    processed: AtomicU64,
    failed: AtomicU64,
    dequeued: AtomicU64,
    live_workers: AtomicUsize,
    tracked_workers: AtomicUsize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Job counters ==========

    /// Record that a worker took a job off the queue.
    pub fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    // ========== Worker gauges ==========

    /// Mark a worker task as alive until the returned guard drops.
    pub fn worker_started(self: &Arc<Self>) -> LiveWorkerGuard {
        self.live_workers.fetch_add(1, Ordering::SeqCst);
        LiveWorkerGuard {
            registry: Arc::clone(self),
        }
    }

    /// Worker tasks that have started and not yet exited.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Mirror of the autoscaler's tracked worker count, for reporting.
    pub fn set_tracked_workers(&self, count: usize) {
        self.tracked_workers.store(count, Ordering::Relaxed);
    }

    pub fn tracked_workers(&self) -> usize {
        self.tracked_workers.load(Ordering::Relaxed)
    }

    // ========== Snapshot ==========

    /// Read every counter, paired with an externally sampled queue depth.
    pub fn snapshot(&self, queue_depth: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed(),
            failed: self.failed(),
            queue_depth,
            live_workers: self.live_workers(),
            tracked_workers: self.tracked_workers(),
        }
    }
}

/// Decrements the live worker gauge when the owning task exits.
#[derive(Debug)]
pub struct LiveWorkerGuard {
    registry: Arc<MetricsRegistry>,
}

impl Drop for LiveWorkerGuard {
    fn drop(&mut self) {
        self.registry.live_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub queue_depth: usize,
    pub live_workers: usize,
    pub tracked_workers: usize,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[METRICS] Processed: {} | Failed: {} | Queue: {} | Workers: {} (tracked {})",
            self.processed, self.failed, self.queue_depth, self.live_workers, self.tracked_workers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.processed(), 0);
        assert_eq!(registry.failed(), 0);
        assert_eq!(registry.live_workers(), 0);
    }

    #[test]
    fn test_counters() {
        let registry = MetricsRegistry::new();
        for _ in 0..3 {
            registry.record_dequeued();
        }
        registry.record_processed();
        registry.record_processed();
        registry.record_failed();

        let snapshot = registry.snapshot(7);
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.queue_depth, 7);
        assert_eq!(registry.dequeued(), 3);
    }

    #[test]
    fn test_live_worker_guard() {
        let registry = Arc::new(MetricsRegistry::new());
        let a = registry.worker_started();
        let b = registry.worker_started();
        assert_eq!(registry.live_workers(), 2);

        drop(a);
        assert_eq!(registry.live_workers(), 1);
        drop(b);
        assert_eq!(registry.live_workers(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            registry.record_processed();
                        } else {
                            registry.record_failed();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.processed(), 4000);
        assert_eq!(registry.failed(), 4000);
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = MetricsSnapshot {
            processed: 10,
            failed: 1,
            queue_depth: 42,
            live_workers: 6,
            tracked_workers: 5,
        };
        assert_eq!(
            snapshot.to_string(),
            "[METRICS] Processed: 10 | Failed: 1 | Queue: 42 | Workers: 6 (tracked 5)"
        );
    }
}
