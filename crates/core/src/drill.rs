//! Recovery drill constants and state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and the recovery engine. Status IDs are
//! intentionally duplicated from the `db` crate's `TaskStatus` enum because
//! `core` must not depend on sqlx.

// ---------------------------------------------------------------------------
// Clone sizing defaults
// ---------------------------------------------------------------------------

/// Instance class used for the drill target when the task does not override
/// it. The smallest class the provider offers; drill targets only need to
/// survive a validation pass.
pub const DEFAULT_INSTANCE_CLASS: &str = "rds.mysql.s1.small";

/// Storage allocated to the drill target when the task does not override it.
pub const DEFAULT_STORAGE_GB: i32 = 20;

// ---------------------------------------------------------------------------
// Pipeline progress milestones
// ---------------------------------------------------------------------------

/// Progress value written when the clone request is about to be sent.
pub const PROGRESS_CLONE_REQUESTED: i16 = 20;

/// Progress value written once the provider has accepted the clone.
pub const PROGRESS_CLONE_ACCEPTED: i16 = 40;

/// Progress value written once the target instance reports Running.
pub const PROGRESS_INSTANCE_READY: i16 = 70;

/// Progress value written when data validation begins.
pub const PROGRESS_VALIDATING: i16 = 90;

/// Progress value of a completed drill.
pub const PROGRESS_DONE: i16 = 100;

/// Interpolate progress for the wait-for-ready phase.
///
/// Maps elapsed wait time linearly onto the 40..70 band. Clamped at both
/// ends so a slow poll loop can never report progress outside the band or
/// move it backwards.
pub fn wait_phase_progress(elapsed_secs: u64, max_wait_secs: u64) -> i16 {
    if max_wait_secs == 0 {
        return PROGRESS_INSTANCE_READY;
    }
    let span = (PROGRESS_INSTANCE_READY - PROGRESS_CLONE_ACCEPTED) as u64;
    let gained = (elapsed_secs * span / max_wait_secs).min(span) as i16;
    PROGRESS_CLONE_ACCEPTED + gained
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Task status IDs matching `task_statuses` seed data (1-based SMALLSERIAL).
pub mod state_machine {
    pub const PENDING: i16 = 1;
    pub const RUNNING: i16 = 2;
    pub const SUCCESS: i16 = 3;
    pub const FAILED: i16 = 4;
    pub const CANCELLED: i16 = 5;
    pub const TIMEOUT: i16 = 6;

    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// `Failed` is terminal for the pipeline but re-enterable: a failed drill
    /// may be retried by issuing a fresh execute, which is modelled as the
    /// Failed -> Running edge. Success, Cancelled, and Timeout have no
    /// outgoing edges.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> Running, Cancelled
            PENDING => &[RUNNING, CANCELLED],
            // Running -> Success, Failed, Cancelled, Timeout
            RUNNING => &[SUCCESS, FAILED, CANCELLED, TIMEOUT],
            // Failed -> Running (explicit retry)
            FAILED => &[RUNNING],
            // Success, Cancelled, Timeout: no further transitions
            SUCCESS | CANCELLED | TIMEOUT => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// A status from which `execute` is accepted.
    pub fn can_execute(status: i16) -> bool {
        can_transition(status, RUNNING)
    }

    /// A status from which `cancel` is accepted.
    pub fn can_cancel(status: i16) -> bool {
        can_transition(status, CANCELLED)
    }

    /// Whether the pipeline is finished with this task.
    ///
    /// Note that Failed is terminal here even though it is re-enterable via
    /// retry; "terminal" means the async pipeline will write nothing further.
    pub fn is_terminal(status: i16) -> bool {
        matches!(status, SUCCESS | FAILED | CANCELLED | TIMEOUT)
    }

    /// Human-readable name for a status ID (for error messages).
    pub fn status_name(id: i16) -> &'static str {
        match id {
            PENDING => "Pending",
            RUNNING => "Running",
            SUCCESS => "Success",
            FAILED => "Failed",
            CANCELLED => "Cancelled",
            TIMEOUT => "Timeout",
            _ => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

/// Whole-second drill duration, never negative.
pub fn duration_seconds(started_at: crate::types::Timestamp, completed_at: crate::types::Timestamp) -> i32 {
    (completed_at - started_at).num_seconds().max(0) as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
