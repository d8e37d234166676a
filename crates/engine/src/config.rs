//! Engine tuning knobs.

use std::time::Duration;

/// Timing configuration for the orchestrator and its sweeps.
///
/// Defaults match production expectations; tests shrink the poll interval to
/// milliseconds so pipelines finish quickly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the wait-for-ready phase polls the provider.
    pub ready_poll_interval: Duration,
    /// Hard ceiling on the wait-for-ready phase.
    pub ready_wait_ceiling: Duration,
    /// A Running task older than this is reaped as Timeout.
    pub stuck_ceiling: Duration,
    /// How often the due-task sweep runs.
    pub due_sweep_interval: Duration,
    /// How often the stuck-task reaper runs.
    pub stuck_sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ready_poll_interval: Duration::from_secs(30),
            ready_wait_ceiling: Duration::from_secs(30 * 60),
            stuck_ceiling: Duration::from_secs(2 * 60 * 60),
            due_sweep_interval: Duration::from_secs(60 * 60),
            stuck_sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}
