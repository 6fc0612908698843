//! Backlog-driven worker autoscaler.
//!
//! Every tick the autoscaler samples the queue depth and compares it with two
//! disjoint watermarks:
//!
//! - depth above `high_watermark` while below `max_workers`: spawn up to
//!   `batch_size` new workers.
//! - depth below `low_watermark` while above `min_workers`: reduce the
//!   tracked worker count by one.
//!
//! Scale-down is logical by default. Workers cannot be addressed
//! individually once spawned, so a reduction only adjusts the bookkeeping and
//! surplus workers keep running until the queue closes. [`ScaleDownMode::Retire`]
//! additionally asks one worker to exit between jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AutoscalerConfig;
use crate::metrics::MetricsRegistry;
use crate::queue::JobQueue;

/// Effect of a scale-down decision on running workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ScaleDownMode {
    /// Only the tracked count changes; no worker stops.
    #[default]
    Logical,
    /// One worker is also asked to exit once it is between jobs.
    Retire,
}

impl std::fmt::Display for ScaleDownMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleDownMode::Logical => write!(f, "logical"),
            ScaleDownMode::Retire => write!(f, "retire"),
        }
    }
}

/// Decision taken for a single backlog sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingDecision {
    /// Backlog between the watermarks, or already at a bound.
    Hold,
    /// Add `count` workers.
    ScaleUp { queue_depth: usize, count: usize },
    /// Reduce the tracked count by one.
    ScaleDown { queue_depth: usize },
}

/// Side effects the autoscaler needs from the pool.
pub trait WorkerSpawner: Send + Sync {
    /// Start one more worker and return its id.
    fn spawn_worker(&self) -> usize;

    /// Ask one running worker to exit between jobs.
    fn retire_worker(&self);

    /// Drop up to `limit` retirement requests that no worker has claimed
    /// yet, returning how many were dropped.
    fn withdraw_retirements(&self, limit: usize) -> usize;
}

/// Tracks the logical worker count and applies the scaling policy.
#[derive(Debug)]
pub struct Autoscaler {
    config: AutoscalerConfig,
    active_workers: AtomicUsize,
    peak_workers: AtomicUsize,
    metrics: Arc<MetricsRegistry>,
}

impl Autoscaler {
    pub fn new(
        config: AutoscalerConfig,
        initial_workers: usize,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        metrics.set_tracked_workers(initial_workers);
        Self {
            config,
            active_workers: AtomicUsize::new(initial_workers),
            peak_workers: AtomicUsize::new(initial_workers),
            metrics,
        }
    }

    pub fn config(&self) -> &AutoscalerConfig {
        &self.config
    }

    /// The tracked worker count. Not necessarily the number of live tasks.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Highest tracked worker count seen so far.
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::SeqCst)
    }

    /// Decide what to do for a backlog sample, without side effects.
    pub fn evaluate(&self, queue_depth: usize) -> ScalingDecision {
        let active = self.active_workers();

        if queue_depth > self.config.high_watermark && active < self.config.max_workers {
            let count = self.config.batch_size.min(self.config.max_workers - active);
            return ScalingDecision::ScaleUp { queue_depth, count };
        }

        if queue_depth < self.config.low_watermark && active > self.config.min_workers {
            return ScalingDecision::ScaleDown { queue_depth };
        }

        ScalingDecision::Hold
    }

    /// Evaluate a backlog sample and apply the decision through `spawner`.
    pub fn check_and_scale<S: WorkerSpawner + ?Sized>(
        &self,
        queue_depth: usize,
        spawner: &S,
    ) -> ScalingDecision {
        let decision = self.evaluate(queue_depth);

        match decision {
            ScalingDecision::Hold => {}
            ScalingDecision::ScaleUp { count, .. } => {
                // A withdrawn retirement keeps a live worker that was already
                // dropped from the tracked count, so it replaces one spawn.
                let reclaimed = match self.config.scale_down {
                    ScaleDownMode::Retire => spawner.withdraw_retirements(count),
                    ScaleDownMode::Logical => 0,
                };

                for _ in 0..reclaimed {
                    let total = self.track_added_worker();
                    info!(
                        "Autoscaler: Reclaimed retiring worker (total workers: {})",
                        total
                    );
                }

                for _ in reclaimed..count {
                    let id = spawner.spawn_worker();
                    let total = self.track_added_worker();
                    info!(
                        "Autoscaler: Spawned extra worker {} (total workers: {})",
                        id, total
                    );
                }
            }
            ScalingDecision::ScaleDown { .. } => {
                let total = self.active_workers.fetch_sub(1, Ordering::SeqCst) - 1;
                self.metrics.set_tracked_workers(total);
                if self.config.scale_down == ScaleDownMode::Retire {
                    spawner.retire_worker();
                }
                info!(
                    "Autoscaler: Reducing worker count ({} total: {})",
                    self.config.scale_down, total
                );
            }
        }

        decision
    }

    fn track_added_worker(&self) -> usize {
        let total = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_workers.fetch_max(total, Ordering::SeqCst);
        self.metrics.set_tracked_workers(total);
        total
    }

    /// Sample the queue on every tick until `token` fires.
    ///
    /// The first sample is taken one full interval after start.
    pub fn start(
        self: Arc<Self>,
        queue: Arc<JobQueue>,
        spawner: Arc<dyn WorkerSpawner>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let period = self.config.interval();

        tokio::spawn(async move {
            debug!("Autoscaler started with a {:?} interval", period);
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.check_and_scale(queue.depth(), spawner.as_ref());
                    }
                }
            }

            debug!("Autoscaler stopped");
        })
    }
}
