mod cli;
mod config;
mod error;
mod logging;
mod summary;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hashpool_engine::{Shutdown, WorkerPool};
use tracing::{error, info};

use crate::cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    logging::init_logging(args.verbose, args.quiet)?;

    let config = config::resolve(&args).context("Invalid configuration")?;
    info!(
        "Scanning {} with {} workers (max {})",
        args.dir.display(),
        config.initial_workers,
        config.autoscaler.max_workers
    );

    let pool = WorkerPool::new(config).context("Failed to initialize worker pool")?;

    let shutdown = Shutdown::new();
    let listener = shutdown.listen_for_signals();

    let report = pool.run(&args.dir, &shutdown).await;
    listener.abort();

    summary::print_summary(&report).context("Failed to write summary")?;

    if report.cancelled {
        info!("Run was interrupted before completion");
    }

    Ok(())
}
