//! Pool configuration for the CLI: optional TOML file, then flag overrides.

use std::path::Path;

use hashpool_engine::PoolConfig;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Build the pool configuration for this invocation.
pub fn resolve(args: &Args) -> Result<PoolConfig> {
    let mut config = match &args.config {
        Some(path) => load(path)?,
        None => PoolConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate().map_err(hashpool_engine::Error::from)?;
    Ok(config)
}

/// Read a TOML file. Missing keys fall back to defaults.
pub fn load(path: &Path) -> Result<PoolConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| AppError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_overrides(config: &mut PoolConfig, args: &Args) {
    if let Some(workers) = args.workers {
        config.initial_workers = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue.capacity = capacity;
    }
    if let Some(max) = args.max_workers {
        config.autoscaler.max_workers = max;
    }
    if let Some(min) = args.min_workers {
        config.autoscaler.min_workers = min;
    }
    if let Some(mode) = args.scale_down {
        config.autoscaler.scale_down = mode;
    }
    if let Some(delay) = args.delay_ms {
        config.work_delay_ms = delay;
    }
    if args.no_autoscale {
        config.autoscaler.enabled = false;
    }
    if args.no_metrics {
        config.reporter.enabled = false;
    }
}
