//! Periodic engine sweeps.
//!
//! Each sweep is a long-running async loop intended to be spawned via
//! `tokio::spawn`, accepting a [`CancellationToken`] for graceful shutdown.
//! The loop bodies live on the orchestrator so tests can invoke them
//! directly with a manual clock instead of waiting out real intervals.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::orchestrator::RecoveryOrchestrator;

/// Launches due scheduled drills.
pub struct DueTaskSweep {
    orchestrator: Arc<RecoveryOrchestrator>,
}

impl DueTaskSweep {
    pub fn new(orchestrator: Arc<RecoveryOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        tracing::info!(interval_secs = interval.as_secs(), "Due-task sweep started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Due-task sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.orchestrator.run_due_tasks().await {
                        Ok(launched) if launched > 0 => {
                            tracing::info!(launched, "Due-task sweep launched drills");
                        }
                        Ok(_) => {
                            tracing::debug!("Due-task sweep: nothing due");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Due-task sweep cycle failed");
                        }
                    }
                }
            }
        }
    }
}

/// Times out drills that have been Running past the stuck ceiling.
pub struct StuckTaskReaper {
    orchestrator: Arc<RecoveryOrchestrator>,
}

impl StuckTaskReaper {
    pub fn new(orchestrator: Arc<RecoveryOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run the reaper loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        tracing::info!(interval_secs = interval.as_secs(), "Stuck-task reaper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Stuck-task reaper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let reaped = self.orchestrator.reap_stuck_tasks().await;
                    if reaped > 0 {
                        tracing::warn!(reaped, "Stuck-task reaper timed out drills");
                    }
                }
            }
        }
    }
}
