//! Periodic metrics snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::queue::JobQueue;

/// Samples the registry and the queue on a fixed interval.
///
/// Purely observational: it only reads atomics and the queue length. Each
/// snapshot is logged and published on a `watch` channel, so a slow
/// subscriber only ever sees the latest value.
pub struct MetricsReporter {
    metrics: Arc<MetricsRegistry>,
    queue: Arc<JobQueue>,
    interval: Duration,
    snapshot_tx: watch::Sender<MetricsSnapshot>,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<MetricsRegistry>, queue: Arc<JobQueue>, interval: Duration) -> Self {
        let initial = metrics.snapshot(queue.depth());
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            metrics,
            queue,
            interval,
            snapshot_tx,
        }
    }

    /// Subscribe to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<MetricsSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Take and publish one snapshot.
    pub fn sample(&self) -> MetricsSnapshot {
        let snapshot = self.metrics.snapshot(self.queue.depth());
        self.snapshot_tx.send_replace(snapshot);
        snapshot
    }

    /// Report on every tick until `token` fires.
    ///
    /// Missed ticks are skipped rather than replayed.
    pub fn start(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = self.sample();
                        info!("{}", snapshot);
                    }
                }
            }

            debug!("Metrics reporter shutting down...");
        })
    }
}
