//! Process-wide shutdown coordination.
//!
//! A thin wrapper over a [`CancellationToken`] that records whether it has
//! fired, so that repeated triggers (a second Ctrl-C, a SIGTERM after a
//! SIGINT) are silently ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Single cancellation source shared by every component of a run.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// The broadcast token every suspension point races against.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// A token cancelled by this coordinator, but cancellable on its own too.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Cancel the run. Returns `true` only for the first trigger.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already in progress, ignoring {}", reason);
            return false;
        }
        info!("Received shutdown signal ({}), shutting down...", reason);
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the coordinator fires.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Trigger on Ctrl-C or, on unix, SIGTERM.
    ///
    /// The listener exits once the coordinator fires for any reason.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.triggered() => {}
                reason = wait_for_signal() => {
                    shutdown.trigger(reason);
                }
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        reason = ctrl_c() => reason,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "interrupt",
        Err(e) => {
            // Without a handler the only way out is a normal finish.
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending().await
        }
    }
}
