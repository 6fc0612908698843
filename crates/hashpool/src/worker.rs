//! Hashing worker loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::digest::FileDigest;
use crate::error_log::ErrorLog;
use crate::metrics::{LiveWorkerGuard, MetricsRegistry};
use crate::queue::{Job, JobQueue, QueueError};

/// Everything a worker needs, shared by the whole pool.
pub(crate) struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub metrics: Arc<MetricsRegistry>,
    pub errors: Arc<ErrorLog>,
    pub digest: Arc<dyn FileDigest>,
    /// The process-wide shutdown token.
    pub token: CancellationToken,
    pub work_delay: Duration,
    pub retirements: RetireRequests,
}

/// Outstanding requests for a worker to exit between jobs.
#[derive(Debug, Default)]
pub(crate) struct RetireRequests {
    pending: AtomicUsize,
    notify: Notify,
}

impl RetireRequests {
    pub fn request(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Withdraw up to `limit` unclaimed requests, returning how many were withdrawn.
    pub fn withdraw(&self, limit: usize) -> usize {
        let prev = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n - n.min(limit)))
            .unwrap_or_else(|n| n);
        prev.min(limit)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Claim one request, if any is outstanding.
    fn try_claim(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Why a worker loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The queue was closed and fully drained.
    Drained,
    /// The shutdown token fired.
    Cancelled,
    /// The worker honoured a retirement request.
    Retired,
}

/// Spawn a worker onto `tracker`.
///
/// The live-worker gauge is raised before the task is scheduled so that a
/// snapshot never under-counts a freshly spawned worker.
pub(crate) fn spawn_worker(tracker: &TaskTracker, ctx: Arc<WorkerContext>, id: usize) {
    let live = ctx.metrics.worker_started();
    tracker.spawn(run_worker(ctx, id, live));
}

pub(crate) async fn run_worker(
    ctx: Arc<WorkerContext>,
    id: usize,
    _live: LiveWorkerGuard,
) -> WorkerExit {
    debug!("Worker {} started", id);

    loop {
        // Registered before the claim check so a request landing in between
        // still wakes this worker.
        let notified = ctx.retirements.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if ctx.retirements.try_claim() {
            debug!("Worker {} retiring", id);
            return WorkerExit::Retired;
        }

        let next = tokio::select! {
            next = ctx.queue.dequeue(&ctx.token) => next,
            _ = &mut notified => continue,
        };

        match next {
            Ok(Some(job)) => process_job(&ctx, id, job).await,
            Ok(None) | Err(QueueError::Closed) => {
                debug!("Worker {} finished, queue drained", id);
                return WorkerExit::Drained;
            }
            Err(QueueError::Cancelled) => {
                info!("Worker {} shutting down...", id);
                return WorkerExit::Cancelled;
            }
        }
    }
}

/// Hash one file and record the outcome. Runs to completion once started.
async fn process_job(ctx: &WorkerContext, id: usize, job: Job) {
    ctx.metrics.record_dequeued();

    match ctx.digest.digest(job.path()).await {
        Ok(digest) => {
            if !ctx.work_delay.is_zero() {
                tokio::time::sleep(ctx.work_delay).await;
            }
            info!("Processed: {} | {}: {}", job, ctx.digest.name(), digest);
            ctx.metrics.record_processed();
        }
        Err(e) => {
            warn!("Worker {} failed: {}", id, e);
            ctx.metrics.record_failed();
            ctx.errors.push(e.into());
        }
    }
}
