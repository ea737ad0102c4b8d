//! Interrupt handling shared by the crawl and download phases

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Conventional exit status for a process ended by SIGINT
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// A cloneable flag that stops coordinators from submitting new work
///
/// Coordinators check the flag before dispatching each top-level task.
/// Work already in flight is left to finish or fail on its own.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Spawns a task that raises the flag on the first Ctrl-C
    ///
    /// A second Ctrl-C exits the process with status 130 without waiting
    /// for in-flight work.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::warn!("Interrupt received, finishing in-flight work (Ctrl-C again to quit)");
            flag.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::error!("Second interrupt, exiting now");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());

        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
