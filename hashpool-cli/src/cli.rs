use std::path::PathBuf;

use clap::Parser;
use hashpool_engine::ScaleDownMode;

/// Hash every file under a directory with an autoscaling worker pool.
#[derive(Debug, Clone, Parser)]
#[command(name = "hashpool", version, about)]
pub struct Args {
    /// Directory to scan
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Initial number of workers [default: 4]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// TOML file with pool settings; flags take precedence
    #[arg(short, long, env = "HASHPOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of buffered paths
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Upper bound for autoscaled workers
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Lower bound for the tracked worker count
    #[arg(long)]
    pub min_workers: Option<usize>,

    /// What a scale-down decision does to running workers
    #[arg(long, value_enum)]
    pub scale_down: Option<ScaleDownMode>,

    /// Simulated work per file in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Run with the initial workers only
    #[arg(long)]
    pub no_autoscale: bool,

    /// Disable the periodic metrics line
    #[arg(long)]
    pub no_metrics: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["hashpool"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("."));
        assert_eq!(args.workers, None);
        assert!(!args.no_autoscale);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "hashpool",
            "--dir",
            "/data",
            "-w",
            "8",
            "--scale-down",
            "retire",
            "--max-workers",
            "32",
        ])
        .unwrap();
        assert_eq!(args.dir, PathBuf::from("/data"));
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.scale_down, Some(ScaleDownMode::Retire));
        assert_eq!(args.max_workers, Some(32));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["hashpool", "-v", "-q"]).is_err());
    }
}
