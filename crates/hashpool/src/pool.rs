//! Pool orchestration.
//!
//! Wires the queue, workers, reporter, autoscaler and producer together for
//! one run and blocks until every worker has exited.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::autoscaler::{Autoscaler, WorkerSpawner};
use crate::config::PoolConfig;
use crate::digest::{FileDigest, Sha256Digest};
use crate::error::Result;
use crate::error_log::{ErrorLog, FileFailure};
use crate::metrics::MetricsRegistry;
use crate::producer::{self, WalkError, WalkOutcome};
use crate::queue::JobQueue;
use crate::reporter::MetricsReporter;
use crate::shutdown::Shutdown;
use crate::worker::{RetireRequests, WorkerContext, spawn_worker};

/// Final result of a pool run.
#[derive(Debug)]
pub struct RunReport {
    pub processed: u64,
    pub failed: u64,
    /// Per-file failures in encounter order.
    pub errors: Vec<FileFailure>,
    /// Paths the producer handed to the queue.
    pub enqueued: u64,
    /// Traversal entries skipped as unreadable.
    pub skipped: u64,
    /// Fatal traversal error, if any. Never set for cancellation.
    pub walk_error: Option<WalkError>,
    /// Whether the shutdown coordinator fired during the run.
    pub cancelled: bool,
    pub peak_tracked_workers: usize,
    pub final_tracked_workers: usize,
    pub duration: Duration,
}

/// An autoscaling pool of hashing workers.
pub struct WorkerPool {
    config: PoolConfig,
    digest: Arc<dyn FileDigest>,
}

impl WorkerPool {
    /// Create a pool that hashes with SHA-256.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_digest(config, Arc::new(Sha256Digest))
    }

    /// Create a pool with a custom digest collaborator.
    pub fn with_digest(config: PoolConfig, digest: Arc<dyn FileDigest>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, digest })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Hash every file under `root`.
    ///
    /// Returns once all workers have exited, either because the queue was
    /// drained or because `shutdown` fired. Triggering `shutdown` never
    /// abandons a job a worker has already started.
    pub async fn run(&self, root: impl Into<PathBuf>, shutdown: &Shutdown) -> RunReport {
        let started = Instant::now();
        let config = &self.config;

        // Stops the reporter, the autoscaler and a stranded producer once the
        // workers are gone, without firing the process-wide coordinator.
        let background = shutdown.child_token();

        let queue = Arc::new(JobQueue::new(config.queue.capacity));
        let metrics = Arc::new(MetricsRegistry::new());
        let errors = Arc::new(ErrorLog::new());
        let tracker = TaskTracker::new();

        let ctx = Arc::new(WorkerContext {
            queue: queue.clone(),
            metrics: metrics.clone(),
            errors: errors.clone(),
            digest: self.digest.clone(),
            token: shutdown.token().clone(),
            work_delay: config.work_delay(),
            retirements: RetireRequests::default(),
        });

        let reporter = config.reporter.enabled.then(|| {
            Arc::new(MetricsReporter::new(
                metrics.clone(),
                queue.clone(),
                config.reporter.interval(),
            ))
            .start(background.clone())
        });

        info!("Starting worker pool with {} workers", config.initial_workers);
        for id in 0..config.initial_workers {
            spawn_worker(&tracker, ctx.clone(), id);
        }

        let autoscaler = Arc::new(Autoscaler::new(
            config.autoscaler.clone(),
            config.initial_workers,
            metrics.clone(),
        ));
        let scaler = config.autoscaler.enabled.then(|| {
            let spawner = Arc::new(PoolSpawner {
                tracker: tracker.clone(),
                ctx: ctx.clone(),
                next_id: AtomicUsize::new(config.initial_workers + 1),
            });
            autoscaler
                .clone()
                .start(queue.clone(), spawner, background.clone())
        });

        let producer = tokio::spawn(producer::produce(
            root.into(),
            queue.clone(),
            background.clone(),
        ));

        tracker.close();
        tracker.wait().await;
        debug!("All workers exited");

        background.cancel();
        let walk = join_producer(producer).await;
        join_background("reporter", reporter).await;
        join_background("autoscaler", scaler).await;

        if let Some(e) = &walk.error {
            debug!("Walk ended with error: {}", e);
        }

        let report = RunReport {
            processed: metrics.processed(),
            failed: metrics.failed(),
            errors: errors.drain(),
            enqueued: walk.enqueued,
            skipped: walk.skipped,
            walk_error: walk.error,
            cancelled: shutdown.is_triggered(),
            peak_tracked_workers: autoscaler.peak_workers(),
            final_tracked_workers: autoscaler.active_workers(),
            duration: started.elapsed(),
        };
        info!(
            "Processing complete: {} processed, {} failed in {:.2?}",
            report.processed, report.failed, report.duration
        );
        report
    }
}

/// Spawns extra workers onto the pool's tracker for the autoscaler.
struct PoolSpawner {
    tracker: TaskTracker,
    ctx: Arc<WorkerContext>,
    next_id: AtomicUsize,
}

impl WorkerSpawner for PoolSpawner {
    fn spawn_worker(&self) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        spawn_worker(&self.tracker, self.ctx.clone(), id);
        id
    }

    fn retire_worker(&self) {
        self.ctx.retirements.request();
    }

    fn withdraw_retirements(&self, limit: usize) -> usize {
        self.ctx.retirements.withdraw(limit)
    }
}

async fn join_producer(handle: JoinHandle<WalkOutcome>) -> WalkOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => WalkOutcome {
            error: Some(WalkError::Task(e.to_string())),
            ..Default::default()
        },
    }
}

async fn join_background(name: &str, handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle
        && let Err(e) = handle.await
    {
        warn!("{} task failed: {}", name, e);
    }
}
