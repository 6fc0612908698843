//! # Hashpool Engine
//!
//! An autoscaling worker pool that walks a directory tree, hashes every file it
//! finds and keeps live throughput metrics while it runs.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────────┐   paths    ┌─────────────┐   paths   ┌──────────┐
//!  │  Producer  │ ─────────▶ │  JobQueue   │ ────────▶ │ Workers  │
//!  │ (walkdir)  │            │ (bounded)   │           │ 0..N     │
//!  └────────────┘            └──────┬──────┘           └────┬─────┘
//!                                   │ depth                 │ counters
//!                          ┌────────▼────────┐     ┌────────▼────────┐
//!                          │   Autoscaler    │     │ MetricsRegistry │
//!                          │ (spawns more)   │     │  + ErrorLog     │
//!                          └─────────────────┘     └────────┬────────┘
//!                                                           │ snapshot
//!                                                  ┌────────▼────────┐
//!                                                  │ MetricsReporter │
//!                                                  └─────────────────┘
//! ```
//!
//! Every component shares a single [`Shutdown`] coordinator. Cancelling it
//! stops the producer, the workers and both background loops at their next
//! suspension point.
//!
//! ## Example
//!
//! ```ignore
//! use hashpool_engine::{PoolConfig, Shutdown, WorkerPool};
//!
//! let shutdown = Shutdown::new();
//! let pool = WorkerPool::new(PoolConfig::default())?;
//! let report = pool.run(".", &shutdown).await;
//! println!("processed {} files", report.processed);
//! ```

pub mod autoscaler;
pub mod config;
pub mod digest;
pub mod error;
pub mod error_log;
pub mod metrics;
pub mod pool;
pub mod producer;
pub mod queue;
pub mod reporter;
pub mod shutdown;
mod worker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use autoscaler::{Autoscaler, ScaleDownMode, ScalingDecision, WorkerSpawner};
pub use config::{AutoscalerConfig, PoolConfig, QueueConfig, ReporterConfig};
pub use digest::{DigestError, FileDigest, Sha256Digest};
pub use error::{ConfigError, Error, Result};
pub use error_log::{ErrorLog, FileFailure};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use pool::{RunReport, WorkerPool};
pub use producer::{WalkError, WalkOutcome};
pub use queue::{Job, JobQueue, QueueCloser, QueueError};
pub use reporter::MetricsReporter;
pub use shutdown::Shutdown;
