//! Directory traversal producer.
//!
//! Walks the root with `walkdir` on the blocking pool and feeds every
//! non-directory entry into the job queue. Each enqueue is driven through
//! the runtime handle so it still races the shutdown token while the queue
//! is full.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::queue::{Job, JobQueue, QueueCloser, QueueError};

/// Fatal traversal failure. Per-entry errors below the root never become one.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("walk {}: {source}", .root.display())]
    Root {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("walk task failed: {0}")]
    Task(String),
}

/// Summary of one traversal.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Paths successfully handed to the queue.
    pub enqueued: u64,
    /// Entries skipped because they could not be read.
    pub skipped: u64,
    /// Traversal stopped early because the shutdown token fired.
    pub cancelled: bool,
    pub error: Option<WalkError>,
}

/// Walk `root` and enqueue every file found, then close the queue.
///
/// The queue is closed exactly once when this returns, including when the
/// walk is cancelled, fails, or panics.
pub async fn produce(
    root: impl Into<PathBuf>,
    queue: Arc<JobQueue>,
    token: CancellationToken,
) -> WalkOutcome {
    let root = root.into();
    let closer = queue.closer();
    let handle = Handle::current();

    info!("Walking {}", root.display());
    let result =
        tokio::task::spawn_blocking(move || walk_blocking(&root, &closer, &token, &handle)).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => WalkOutcome {
            error: Some(WalkError::Task(e.to_string())),
            ..Default::default()
        },
    };
    debug!(
        "Walk finished: {} enqueued, {} skipped, cancelled={}",
        outcome.enqueued, outcome.skipped, outcome.cancelled
    );
    outcome
}

fn walk_blocking(
    root: &Path,
    closer: &QueueCloser,
    token: &CancellationToken,
    handle: &Handle,
) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();

    for entry in WalkDir::new(root).follow_links(false) {
        if token.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                outcome.error = Some(WalkError::Root {
                    root: root.to_path_buf(),
                    source,
                });
                break;
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                outcome.skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let job = Job::new(entry.into_path());
        match handle.block_on(closer.queue().enqueue(job, token)) {
            Ok(()) => outcome.enqueued += 1,
            Err(QueueError::Cancelled) => {
                outcome.cancelled = true;
                break;
            }
            Err(QueueError::Closed) => {
                warn!("Job queue closed before traversal finished");
                break;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::time::Duration;

    async fn drain(queue: &JobQueue) -> BTreeSet<PathBuf> {
        let token = CancellationToken::new();
        let mut paths = BTreeSet::new();
        while let Some(job) = queue.dequeue(&token).await.unwrap() {
            paths.insert(job.into_path());
        }
        paths
    }

    #[tokio::test]
    async fn test_directories_are_never_enqueued() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.bin"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let queue = Arc::new(JobQueue::new(16));
        let outcome = produce(dir.path(), queue.clone(), CancellationToken::new()).await;

        assert_eq!(outcome.enqueued, 3);
        assert!(outcome.error.is_none());
        assert!(!outcome.cancelled);
        assert!(queue.is_closed());

        let paths = drain(&queue).await;
        assert_eq!(paths.len(), 3);
        assert!(!paths.contains(&dir.path().join("sub")));
    }

    #[tokio::test]
    async fn test_nested_files_are_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("top"), "1").unwrap();
        fs::write(dir.path().join("x/mid"), "2").unwrap();
        fs::write(dir.path().join("x/y/deep"), "3").unwrap();

        let queue = Arc::new(JobQueue::new(16));
        let outcome = produce(dir.path(), queue.clone(), CancellationToken::new()).await;
        assert_eq!(outcome.enqueued, 3);

        let paths = drain(&queue).await;
        assert!(paths.contains(&dir.path().join("x/y/deep")));
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal_and_closes_queue() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("does-not-exist");

        let queue = Arc::new(JobQueue::new(4));
        let outcome = produce(&root, queue.clone(), CancellationToken::new()).await;

        assert_eq!(outcome.enqueued, 0);
        assert!(matches!(outcome.error, Some(WalkError::Root { .. })));
        assert!(queue.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_while_queue_is_full() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}")), "x").unwrap();
        }

        let queue = Arc::new(JobQueue::new(1));
        let token = CancellationToken::new();
        let producer = tokio::spawn(produce(
            dir.path().to_path_buf(),
            queue.clone(),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!producer.is_finished(), "producer must block on a full queue");
        token.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), producer)
            .await
            .expect("producer should observe cancellation")
            .unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.enqueued, 1);
        assert_eq!(queue.depth(), 1);
        assert!(queue.is_closed());
    }
}
