//! Crate-level error types.

use thiserror::Error;

/// Crate-level result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type.
///
/// Per-file failures never surface here; they are recorded in the
/// [`ErrorLog`](crate::ErrorLog) and counted instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Rejected pool configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    #[error("initial worker count must be at least 1")]
    NoWorkers,

    #[error("low watermark ({low}) must be below high watermark ({high})")]
    Watermarks { low: usize, high: usize },

    #[error("min workers ({min}) must not exceed max workers ({max})")]
    WorkerBounds { min: usize, max: usize },

    #[error("scale-up batch size must be at least 1")]
    ZeroBatch,

    #[error("{name} interval must be greater than zero")]
    ZeroInterval { name: &'static str },

    #[error("retire scale-down requires min workers of at least 1")]
    RetireWithoutFloor,
}
