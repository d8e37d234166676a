//! Task persistence port.
//!
//! The orchestrator only sees this trait; [`PgTaskStore`] delegates to the
//! repositories in `bcp-db`, and the engine tests substitute an in-memory
//! implementation.
//!
//! All state-transition methods return whether the transition applied. A
//! `false` from a pipeline write means the task left Running underneath the
//! pipeline (cancelled or reaped) and the pipeline must stop.

use async_trait::async_trait;
use bcp_core::types::{DbId, Timestamp};
use bcp_db::models::rds_instance::RdsInstance;
use bcp_db::models::recovery_task::{
    CreateRecoveryTask, RecoveryTask, TaskListQuery, TaskStatsFilter,
};
use bcp_db::models::status::StatusId;
use bcp_db::repositories::{InstanceRepo, TaskRepo};
use bcp_db::DbPool;

/// Opaque persistence failure.
#[derive(Debug, thiserror::Error)]
#[error("task store error: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

/// Persistence operations the engine needs.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(
        &self,
        input: &CreateRecoveryTask,
        created_by: DbId,
    ) -> Result<RecoveryTask, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<RecoveryTask>, StoreError>;

    async fn list(&self, query: &TaskListQuery) -> Result<Vec<RecoveryTask>, StoreError>;

    async fn count_by_status(
        &self,
        filter: &TaskStatsFilter,
    ) -> Result<Vec<(StatusId, i64)>, StoreError>;

    async fn has_active_annual(
        &self,
        source_instance_id: DbId,
        compliance_year: i32,
    ) -> Result<bool, StoreError>;

    async fn find_instance(&self, id: DbId) -> Result<Option<RdsInstance>, StoreError>;

    /// Atomic Pending|Failed -> Running transition; the duplicate-execute
    /// guard.
    async fn try_mark_running(&self, id: DbId) -> Result<bool, StoreError>;

    async fn update_progress(&self, id: DbId, percent: i16) -> Result<bool, StoreError>;

    async fn set_target_instance(&self, id: DbId, target: &str) -> Result<bool, StoreError>;

    async fn mark_verifying(&self, id: DbId) -> Result<bool, StoreError>;

    async fn complete(
        &self,
        id: DbId,
        verification_result: &serde_json::Value,
    ) -> Result<bool, StoreError>;

    async fn fail(
        &self,
        id: DbId,
        error: &str,
        verification_result: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError>;

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError>;

    async fn timeout(&self, id: DbId, error: &str) -> Result<bool, StoreError>;

    async fn due_scheduled(&self, now: Timestamp) -> Result<Vec<RecoveryTask>, StoreError>;

    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;
}

/// Production store over the Postgres repositories.
pub struct PgTaskStore {
    pool: DbPool,
}

impl PgTaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(
        &self,
        input: &CreateRecoveryTask,
        created_by: DbId,
    ) -> Result<RecoveryTask, StoreError> {
        Ok(TaskRepo::create(&self.pool, input, created_by).await?)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<RecoveryTask>, StoreError> {
        Ok(TaskRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self, query: &TaskListQuery) -> Result<Vec<RecoveryTask>, StoreError> {
        Ok(TaskRepo::list(&self.pool, query).await?)
    }

    async fn count_by_status(
        &self,
        filter: &TaskStatsFilter,
    ) -> Result<Vec<(StatusId, i64)>, StoreError> {
        Ok(TaskRepo::count_by_status(&self.pool, filter).await?)
    }

    async fn has_active_annual(
        &self,
        source_instance_id: DbId,
        compliance_year: i32,
    ) -> Result<bool, StoreError> {
        Ok(TaskRepo::has_active_annual(&self.pool, source_instance_id, compliance_year).await?)
    }

    async fn find_instance(&self, id: DbId) -> Result<Option<RdsInstance>, StoreError> {
        Ok(InstanceRepo::find_by_id(&self.pool, id).await?)
    }

    async fn try_mark_running(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TaskRepo::try_mark_running(&self.pool, id).await?)
    }

    async fn update_progress(&self, id: DbId, percent: i16) -> Result<bool, StoreError> {
        Ok(TaskRepo::update_progress(&self.pool, id, percent).await?)
    }

    async fn set_target_instance(&self, id: DbId, target: &str) -> Result<bool, StoreError> {
        Ok(TaskRepo::set_target_instance(&self.pool, id, target).await?)
    }

    async fn mark_verifying(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TaskRepo::mark_verifying(&self.pool, id).await?)
    }

    async fn complete(
        &self,
        id: DbId,
        verification_result: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        Ok(TaskRepo::complete(&self.pool, id, verification_result).await?)
    }

    async fn fail(
        &self,
        id: DbId,
        error: &str,
        verification_result: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        Ok(TaskRepo::fail(&self.pool, id, error, verification_result).await?)
    }

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TaskRepo::cancel(&self.pool, id).await?)
    }

    async fn timeout(&self, id: DbId, error: &str) -> Result<bool, StoreError> {
        Ok(TaskRepo::timeout(&self.pool, id, error).await?)
    }

    async fn due_scheduled(&self, now: Timestamp) -> Result<Vec<RecoveryTask>, StoreError> {
        Ok(TaskRepo::due_scheduled(&self.pool, now).await?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TaskRepo::delete(&self.pool, id).await?)
    }
}
