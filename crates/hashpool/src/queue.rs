//! Bounded job queue shared by the producer and every worker.
//!
//! Backed by a bounded `flume` channel so that any number of workers can
//! receive from it. The queue owns the only long-lived sender; closing the
//! queue drops that sender, after which workers drain whatever is still
//! buffered and then observe end-of-stream.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A single file path awaiting hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    path: PathBuf,
}

impl Job {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Outcome of a queue operation that did not move a job.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The shutdown token fired before the operation could complete.
    #[error("queue operation cancelled")]
    Cancelled,

    /// The queue was closed; no further jobs are accepted.
    #[error("queue is closed")]
    Closed,
}

/// Bounded FIFO of pending jobs.
pub struct JobQueue {
    sender: Mutex<Option<flume::Sender<Job>>>,
    receiver: flume::Receiver<Job>,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` buffered jobs.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    /// Push a job, waiting for free space.
    ///
    /// Returns [`QueueError::Cancelled`] if `token` fires first, in which
    /// case the job is dropped.
    pub async fn enqueue(&self, job: Job, token: &CancellationToken) -> Result<(), QueueError> {
        // Clone out of the lock so it is never held across an await.
        let sender = self.sender.lock().clone().ok_or(QueueError::Closed)?;

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(QueueError::Cancelled),
            result = sender.send_async(job) => result.map_err(|_| QueueError::Closed),
        }
    }

    /// Pop the next job.
    ///
    /// `Ok(None)` means the queue is closed and fully drained.
    pub async fn dequeue(&self, token: &CancellationToken) -> Result<Option<Job>, QueueError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(QueueError::Cancelled),
            job = self.receiver.recv_async() => Ok(job.ok()),
        }
    }

    /// Number of buffered, not yet dequeued jobs. Advisory only.
    pub fn depth(&self) -> usize {
        self.receiver.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop accepting jobs. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let closed = self.sender.lock().take().is_some();
        if closed {
            debug!("Job queue closed with {} buffered jobs", self.depth());
        }
        closed
    }

    /// Guard that closes the queue when dropped.
    pub fn closer(self: &Arc<Self>) -> QueueCloser {
        QueueCloser {
            queue: Arc::clone(self),
        }
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("depth", &self.depth())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Closes its queue on drop, whichever way the owner exits.
#[must_use = "the queue is closed as soon as the guard is dropped"]
pub struct QueueCloser {
    queue: Arc<JobQueue>,
}

impl QueueCloser {
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }
}

impl Drop for QueueCloser {
    fn drop(&mut self) {
        self.queue.close();
    }
}
