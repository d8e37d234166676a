//! Recovery task entity models and DTOs.

use bcp_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::status::StatusId;

/// A row from the `recovery_tasks` table.
///
/// Runtime fields (`status_id`, `progress`, timestamps, verification data)
/// are written exclusively by the recovery engine once the task exists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecoveryTask {
    pub id: DbId,
    pub task_name: String,
    pub source_instance_id: DbId,
    pub target_instance_name: String,
    pub restore_type_id: StatusId,
    pub backup_id: Option<String>,
    pub restore_time: Option<Timestamp>,
    pub task_type_id: StatusId,
    pub is_annual_task: bool,
    pub compliance_year: Option<i32>,
    pub scheduled_at: Option<Timestamp>,
    pub instance_class: Option<String>,
    pub storage_size_gb: Option<i32>,
    pub validation_rules: Option<serde_json::Value>,
    pub created_by: DbId,
    pub status_id: StatusId,
    pub progress: i16,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub duration_seconds: Option<i32>,
    pub error_message: Option<String>,
    pub verification_status_id: StatusId,
    pub verification_result: Option<serde_json::Value>,
    /// Provider-side ID of the cloned target, assigned once the clone call
    /// returns.
    pub target_instance_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new recovery task via `POST /api/v1/recovery-tasks`.
///
/// Field-level checks live here; cross-field rules (backup selector XOR,
/// compliance year required for annual drills) are enforced by the engine so
/// scheduler-created tasks go through the same gate.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecoveryTask {
    #[validate(length(min = 1, max = 200))]
    pub task_name: String,
    pub source_instance_id: DbId,
    #[validate(length(min = 1, max = 120))]
    pub target_instance_name: String,
    pub restore_type_id: StatusId,
    pub backup_id: Option<String>,
    pub restore_time: Option<Timestamp>,
    pub task_type_id: StatusId,
    #[serde(default)]
    pub is_annual_task: bool,
    #[validate(range(min = 2000, max = 2100))]
    pub compliance_year: Option<i32>,
    pub scheduled_at: Option<Timestamp>,
    pub instance_class: Option<String>,
    #[validate(range(min = 20, max = 65536))]
    pub storage_size_gb: Option<i32>,
    pub validation_rules: Option<serde_json::Value>,
}

/// Query parameters for `GET /api/v1/recovery-tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    pub status_id: Option<StatusId>,
    pub task_type_id: Option<StatusId>,
    pub compliance_year: Option<i32>,
    pub source_instance_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Filter predicate for the statistics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatsFilter {
    pub task_type_id: Option<StatusId>,
    pub compliance_year: Option<i32>,
    pub source_instance_id: Option<DbId>,
}

/// Fixed-shape status tally returned by the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatistics {
    pub total: i64,
    pub pending: i64,
    pub running: i64,
    pub success: i64,
    pub failed: i64,
    pub cancelled: i64,
    pub timeout: i64,
}

impl TaskStatistics {
    /// Build the tally from `(status_id, count)` rows.
    ///
    /// Rows with an unrecognized status ID still count toward `total`, so a
    /// status added later can never silently vanish from the headline number.
    pub fn from_counts(counts: &[(StatusId, i64)]) -> Self {
        use super::status::TaskStatus;

        let mut stats = Self::default();
        for &(status_id, count) in counts {
            stats.total += count;
            match TaskStatus::from_id(status_id) {
                Some(TaskStatus::Pending) => stats.pending += count,
                Some(TaskStatus::Running) => stats.running += count,
                Some(TaskStatus::Success) => stats.success += count,
                Some(TaskStatus::Failed) => stats.failed += count,
                Some(TaskStatus::Cancelled) => stats.cancelled += count,
                Some(TaskStatus::Timeout) => stats.timeout += count,
                None => {}
            }
        }
        stats
    }
}
