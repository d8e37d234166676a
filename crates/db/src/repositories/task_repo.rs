//! Repository for the `recovery_tasks` table.
//!
//! Every runtime-state transition is a conditional UPDATE guarded by the
//! current status and reports via its `bool` return whether the row was
//! actually transitioned. The engine relies on this for two things: the
//! execute-twice race (only one caller wins `try_mark_running`) and the
//! cooperative cancellation guard (a pipeline write returning `false` means
//! the task left Running underneath the pipeline, which must then stop).

use bcp_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::recovery_task::{
    CreateRecoveryTask, RecoveryTask, TaskListQuery, TaskStatsFilter,
};
use crate::models::status::{StatusId, TaskStatus, VerificationStatus};

/// Column list for `recovery_tasks` queries.
const COLUMNS: &str = "\
    id, task_name, source_instance_id, target_instance_name, \
    restore_type_id, backup_id, restore_time, task_type_id, \
    is_annual_task, compliance_year, scheduled_at, \
    instance_class, storage_size_gb, validation_rules, created_by, \
    status_id, progress, started_at, completed_at, duration_seconds, \
    error_message, verification_status_id, verification_result, \
    target_instance_id, created_at, updated_at";

/// Maximum page size for task listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for task listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD and state-transition operations for recovery tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task in Pending status with zero progress.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRecoveryTask,
        created_by: DbId,
    ) -> Result<RecoveryTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO recovery_tasks (\
                task_name, source_instance_id, target_instance_name, \
                restore_type_id, backup_id, restore_time, task_type_id, \
                is_annual_task, compliance_year, scheduled_at, \
                instance_class, storage_size_gb, validation_rules, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RecoveryTask>(&query)
            .bind(&input.task_name)
            .bind(input.source_instance_id)
            .bind(&input.target_instance_name)
            .bind(input.restore_type_id)
            .bind(&input.backup_id)
            .bind(input.restore_time)
            .bind(input.task_type_id)
            .bind(input.is_annual_task)
            .bind(input.compliance_year)
            .bind(input.scheduled_at)
            .bind(&input.instance_class)
            .bind(input.storage_size_gb)
            .bind(&input.validation_rules)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Fetch a task by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RecoveryTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recovery_tasks WHERE id = $1");
        sqlx::query_as::<_, RecoveryTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks with filtering and pagination, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &TaskListQuery,
    ) -> Result<Vec<RecoveryTask>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx = 1u32;
        let mut binds: Vec<i64> = Vec::new();

        if let Some(status_id) = params.status_id {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
            binds.push(status_id as i64);
        }
        if let Some(task_type_id) = params.task_type_id {
            conditions.push(format!("task_type_id = ${bind_idx}"));
            bind_idx += 1;
            binds.push(task_type_id as i64);
        }
        if let Some(year) = params.compliance_year {
            conditions.push(format!("compliance_year = ${bind_idx}"));
            bind_idx += 1;
            binds.push(year as i64);
        }
        if let Some(instance_id) = params.source_instance_id {
            conditions.push(format!("source_instance_id = ${bind_idx}"));
            bind_idx += 1;
            binds.push(instance_id);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM recovery_tasks {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, RecoveryTask>(&query);
        for value in &binds {
            q = q.bind(value);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count tasks grouped by status under the given filter predicate.
    pub async fn count_by_status(
        pool: &PgPool,
        filter: &TaskStatsFilter,
    ) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx = 1u32;
        let mut binds: Vec<i64> = Vec::new();

        if let Some(task_type_id) = filter.task_type_id {
            conditions.push(format!("task_type_id = ${bind_idx}"));
            bind_idx += 1;
            binds.push(task_type_id as i64);
        }
        if let Some(year) = filter.compliance_year {
            conditions.push(format!("compliance_year = ${bind_idx}"));
            bind_idx += 1;
            binds.push(year as i64);
        }
        if let Some(instance_id) = filter.source_instance_id {
            conditions.push(format!("source_instance_id = ${bind_idx}"));
            let _ = bind_idx;
            binds.push(instance_id);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT status_id, COUNT(*)::BIGINT FROM recovery_tasks {where_clause} \
             GROUP BY status_id"
        );

        let mut q = sqlx::query_as::<_, (StatusId, i64)>(&query);
        for value in &binds {
            q = q.bind(value);
        }
        q.fetch_all(pool).await
    }

    /// Whether an annual drill for this (instance, compliance year) pair
    /// already exists in a blocking status (Pending, Running, or Success).
    ///
    /// Best-effort uniqueness check: there is no database constraint behind
    /// it, so two perfectly concurrent creates can still both pass.
    pub async fn has_active_annual(
        pool: &PgPool,
        source_instance_id: DbId,
        compliance_year: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(\
                SELECT 1 FROM recovery_tasks \
                WHERE source_instance_id = $1 \
                  AND compliance_year = $2 \
                  AND is_annual_task \
                  AND status_id = ANY($3))",
        )
        .bind(source_instance_id)
        .bind(compliance_year)
        .bind(&TaskStatus::ANNUAL_BLOCKING[..])
        .fetch_one(pool)
        .await
    }

    /// Atomically transition a Pending or Failed task to Running.
    ///
    /// Resets all runtime fields so a retried task starts clean. Returns
    /// `false` if the task was not in an executable status, which is how a
    /// concurrent duplicate execute loses the race.
    pub async fn try_mark_running(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET status_id = $2, started_at = NOW(), progress = 0, \
                 completed_at = NULL, duration_seconds = NULL, \
                 error_message = NULL, verification_status_id = $3, \
                 verification_result = NULL, target_instance_id = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(TaskStatus::Running.id())
        .bind(VerificationStatus::Pending.id())
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Failed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Advance progress on a Running task.
    ///
    /// `GREATEST` keeps progress monotone even if writes land out of order.
    /// Returns `false` if the task is no longer Running (cancelled or reaped
    /// underneath the pipeline).
    pub async fn update_progress(
        pool: &PgPool,
        id: DbId,
        percent: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET progress = GREATEST(progress, $2), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(percent)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the provider-side ID of the cloned target instance.
    pub async fn set_target_instance(
        pool: &PgPool,
        id: DbId,
        target_instance_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET target_instance_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(target_instance_id)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the verification phase as started.
    pub async fn mark_verifying(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET verification_status_id = $2, \
                 progress = GREATEST(progress, $3), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(VerificationStatus::InProgress.id())
        .bind(bcp_core::drill::PROGRESS_VALIDATING)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition a Running task to Success.
    ///
    /// Sets progress to 100, stores the verification payload with a Passed
    /// verdict, and computes the drill duration from `started_at`.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        verification_result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET status_id = $2, progress = 100, completed_at = NOW(), \
                 duration_seconds = EXTRACT(EPOCH FROM NOW() - started_at)::INTEGER, \
                 verification_status_id = $3, verification_result = $4, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(TaskStatus::Success.id())
        .bind(VerificationStatus::Passed.id())
        .bind(verification_result)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition a Running task to Failed.
    ///
    /// Verification is marked Failed regardless of which phase broke; a drill
    /// that did not finish has not verified anything.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
        verification_result: Option<&serde_json::Value>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET status_id = $2, completed_at = NOW(), \
                 duration_seconds = EXTRACT(EPOCH FROM \
                     COALESCE(NOW() - started_at, INTERVAL '0'))::INTEGER, \
                 error_message = $3, verification_status_id = $4, \
                 verification_result = COALESCE($5, verification_result), \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $6",
        )
        .bind(id)
        .bind(TaskStatus::Failed.id())
        .bind(error)
        .bind(VerificationStatus::Failed.id())
        .bind(verification_result)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition a Pending or Running task to Cancelled.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET status_id = $2, completed_at = NOW(), \
                 error_message = 'cancelled by user', updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(id)
        .bind(TaskStatus::Cancelled.id())
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition a Running task to Timeout with the given error message.
    ///
    /// Used by both ceiling breaches: the in-pipeline wait-for-ready limit
    /// and the stuck-task reaper.
    pub async fn timeout(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recovery_tasks \
             SET status_id = $2, completed_at = NOW(), \
                 duration_seconds = EXTRACT(EPOCH FROM \
                     COALESCE(NOW() - started_at, INTERVAL '0'))::INTEGER, \
                 error_message = $3, verification_status_id = $4, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(TaskStatus::Timeout.id())
        .bind(error)
        .bind(VerificationStatus::Failed.id())
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Pending tasks whose scheduled time has arrived.
    pub async fn due_scheduled(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<RecoveryTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM recovery_tasks \
             WHERE status_id = $1 AND scheduled_at IS NOT NULL AND scheduled_at <= $2 \
             ORDER BY scheduled_at ASC"
        );
        sqlx::query_as::<_, RecoveryTask>(&query)
            .bind(TaskStatus::Pending.id())
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Administrative delete. Refuses while the task is Running; returns
    /// `false` if nothing was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recovery_tasks WHERE id = $1 AND status_id <> $2")
            .bind(id)
            .bind(TaskStatus::Running.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
