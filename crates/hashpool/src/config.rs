//! Pool configuration.
//!
//! Defaults: 4 initial workers, a queue of 100 paths, a 1 second metrics
//! tick and a 2 second autoscaler tick that scales between 2 and 20 workers
//! around the 10/50 backlog watermarks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autoscaler::ScaleDownMode;
use crate::error::ConfigError;

/// Configuration for the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of buffered paths.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Configuration for the backlog-driven autoscaler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalerConfig {
    /// When false, the pool runs with its initial workers only.
    pub enabled: bool,
    /// Interval in milliseconds between backlog samples.
    pub interval_ms: u64,
    /// Backlog above which workers are added.
    pub high_watermark: usize,
    /// Backlog below which the tracked worker count is reduced.
    pub low_watermark: usize,
    /// Floor for the tracked worker count.
    pub min_workers: usize,
    /// Ceiling for the tracked worker count.
    pub max_workers: usize,
    /// Workers added per scale-up decision.
    pub batch_size: usize,
    /// What a scale-down decision does to running workers.
    pub scale_down: ScaleDownMode,
}

impl AutoscalerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Only meaningful when the autoscaler is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_watermark >= self.high_watermark {
            return Err(ConfigError::Watermarks {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        if self.min_workers > self.max_workers {
            return Err(ConfigError::WorkerBounds {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if self.scale_down == ScaleDownMode::Retire && self.min_workers == 0 {
            return Err(ConfigError::RetireWithoutFloor);
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { name: "autoscaler" });
        }
        Ok(())
    }
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
            high_watermark: 50,
            low_watermark: 10,
            min_workers: 2,
            max_workers: 20,
            batch_size: 2,
            scale_down: ScaleDownMode::default(),
        }
    }
}

/// Configuration for the live metrics reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub enabled: bool,
    /// Interval in milliseconds between snapshots.
    pub interval_ms: u64,
}

impl ReporterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
        }
    }
}

/// Top-level pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers started before traversal begins.
    pub initial_workers: usize,
    /// Simulated per-file work after a digest is computed, in milliseconds.
    pub work_delay_ms: u64,
    pub queue: QueueConfig,
    pub autoscaler: AutoscalerConfig,
    pub reporter: ReporterConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_workers: 4,
            work_delay_ms: 50,
            queue: QueueConfig::default(),
            autoscaler: AutoscalerConfig::default(),
            reporter: ReporterConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }

    /// Check the invariants every component relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.initial_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.autoscaler.enabled {
            self.autoscaler.validate()?;
        }
        if self.reporter.enabled && self.reporter.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { name: "reporter" });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_workers, 4);
        assert_eq!(config.queue.capacity, 100);
        assert_eq!(config.autoscaler.high_watermark, 50);
        assert_eq!(config.autoscaler.low_watermark, 10);
        assert_eq!(config.autoscaler.min_workers, 2);
        assert_eq!(config.autoscaler.max_workers, 20);
        assert_eq!(config.autoscaler.batch_size, 2);
        assert_eq!(config.autoscaler.interval(), Duration::from_secs(2));
        assert_eq!(config.reporter.interval(), Duration::from_secs(1));
        assert_eq!(config.work_delay(), Duration::from_millis(50));
        assert_eq!(config.autoscaler.scale_down, ScaleDownMode::Logical);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlapping_watermarks() {
        let mut config = PoolConfig::default();
        config.autoscaler.low_watermark = 50;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Watermarks { low: 50, high: 50 })
        );
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = PoolConfig::default();
        config.autoscaler.min_workers = 21;
        assert_eq!(
            config.validate(),
            Err(ConfigError::WorkerBounds { min: 21, max: 20 })
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = PoolConfig::default();
        config.queue.capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));

        let mut config = PoolConfig::default();
        config.initial_workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

        let mut config = PoolConfig::default();
        config.autoscaler.batch_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatch));

        let mut config = PoolConfig::default();
        config.reporter.interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval { name: "reporter" })
        );

        // A disabled reporter never ticks, so its interval is irrelevant.
        config.reporter.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_retire_needs_a_floor() {
        let mut config = PoolConfig::default();
        config.autoscaler.min_workers = 0;
        assert!(config.validate().is_ok());

        config.autoscaler.scale_down = ScaleDownMode::Retire;
        assert_eq!(config.validate(), Err(ConfigError::RetireWithoutFloor));
    }

    #[test]
    fn test_disabled_autoscaler_settings_are_not_checked() {
        let mut config = PoolConfig::default();
        config.autoscaler.enabled = false;
        config.autoscaler.low_watermark = 80;
        config.autoscaler.min_workers = 30;
        config.autoscaler.batch_size = 0;
        config.autoscaler.interval_ms = 0;
        assert!(config.validate().is_ok());

        config.autoscaler.enabled = true;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Watermarks { low: 80, high: 50 })
        );
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let json = r#"{"initial_workers": 8, "autoscaler": {"max_workers": 32, "scale_down": "retire"}}"#;
        let config: PoolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.initial_workers, 8);
        assert_eq!(config.autoscaler.max_workers, 32);
        assert_eq!(config.autoscaler.min_workers, 2);
        assert_eq!(config.autoscaler.scale_down, ScaleDownMode::Retire);
        assert_eq!(config.queue.capacity, 100);
    }
}
