//! Recovery drill orchestrator.
//!
//! Owns the task state machine. `execute_task` does the synchronous guard
//! work (status check, atomic Running transition, running-set registration)
//! and detaches the four-phase pipeline onto the runtime; nothing awaits the
//! pipeline, and its errors are persisted onto the task record instead of
//! being surfaced to a caller.

use std::sync::Arc;

use bcp_cloud::{BackupSelector, CloneRequest, RdsProvider};
use bcp_core::audit::{operation_status, operation_types};
use bcp_core::drill::{
    self, state_machine, wait_phase_progress, DEFAULT_INSTANCE_CLASS, DEFAULT_STORAGE_GB,
};
use bcp_core::types::DbId;
use bcp_core::CoreError;
use bcp_db::models::recovery_task::{
    CreateRecoveryTask, RecoveryTask, TaskListQuery, TaskStatistics, TaskStatsFilter,
};
use bcp_db::models::status::{RestoreType, StatusId, TaskStatus, TaskType};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::running::{RunningEntry, RunningSet};
use crate::sink::{AuditEvent, AuditSink};
use crate::store::{StoreError, TaskStore};

/// Error message written by the stuck-task reaper.
const MSG_EXECUTION_TIMED_OUT: &str = "execution timed out";

/// Immediate response to an execute call; the pipeline continues detached.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteReceipt {
    pub task_id: DbId,
    pub status_id: StatusId,
}

/// Drives recovery tasks from creation to a terminal state.
#[derive(Clone)]
pub struct RecoveryOrchestrator {
    store: Arc<dyn TaskStore>,
    provider: Arc<dyn RdsProvider>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    running: Arc<RunningSet>,
    config: EngineConfig,
}

/// How the pipeline's phases concluded, before the terminal write.
enum PhaseOutcome {
    /// All phases done and the validation report says the data checks out.
    Verified(serde_json::Value),
    /// Pipeline ran to the end but validation reported a mismatch.
    ValidationFailed(serde_json::Value),
}

/// Why the pipeline stopped early.
enum PhaseError {
    /// Phase failure; the task becomes Failed with this message.
    Fail(String),
    /// A ceiling breach; the task becomes Timeout with this message.
    Ceiling(String),
    /// A conditional write reported the task left Running (cancelled or
    /// reaped); stop without touching the record.
    Interrupted,
    /// The store itself is unavailable; nothing sane can be written.
    Store(StoreError),
}

impl From<StoreError> for PhaseError {
    fn from(err: StoreError) -> Self {
        PhaseError::Store(err)
    }
}

/// Convert a conditional-write result into pipeline control flow.
fn applied(write: bool) -> Result<(), PhaseError> {
    if write {
        Ok(())
    } else {
        Err(PhaseError::Interrupted)
    }
}

impl RecoveryOrchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        provider: Arc<dyn RdsProvider>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            audit,
            clock,
            running: Arc::new(RunningSet::new()),
            config,
        }
    }

    /// The running-set, for inspection by tests and operators.
    pub fn running(&self) -> &RunningSet {
        &self.running
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create a new drill in Pending status.
    ///
    /// Verifies the source instance exists and, for annual drills, that no
    /// other annual drill for the same (instance, compliance year) pair is
    /// Pending, Running, or Success. The uniqueness check is best-effort:
    /// there is no backing database constraint, so two perfectly concurrent
    /// creates can both pass it.
    pub async fn create_task(
        &self,
        input: &CreateRecoveryTask,
        actor: DbId,
    ) -> Result<RecoveryTask, CoreError> {
        validate_spec(input)?;

        if self
            .store
            .find_instance(input.source_instance_id)
            .await
            .map_err(internal)?
            .is_none()
        {
            return Err(CoreError::NotFound {
                entity: "RdsInstance",
                id: input.source_instance_id,
            });
        }

        // validate_spec guarantees the year is present for annual drills.
        if let (true, Some(year)) = (input.is_annual_task, input.compliance_year) {
            if self
                .store
                .has_active_annual(input.source_instance_id, year)
                .await
                .map_err(internal)?
            {
                return Err(CoreError::Conflict(format!(
                    "an active annual drill already exists for instance {} in {year}",
                    input.source_instance_id
                )));
            }
        }

        let task = self.store.create(input, actor).await.map_err(internal)?;
        tracing::info!(task_id = task.id, task_name = %task.task_name, "Recovery drill created");

        self.audit
            .record(AuditEvent::for_task(
                actor,
                task.id,
                &task.task_name,
                operation_types::CREATE,
                operation_status::SUCCESS,
                "recovery drill created",
            ))
            .await;

        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Start executing a Pending or Failed drill.
    ///
    /// Returns as soon as the task is Running; the pipeline proceeds
    /// detached. The Pending|Failed -> Running transition is a conditional
    /// UPDATE, so of two concurrent calls exactly one wins and the other
    /// gets a Conflict.
    pub async fn execute_task(
        &self,
        task_id: DbId,
        actor: DbId,
    ) -> Result<ExecuteReceipt, CoreError> {
        let task = self
            .store
            .find_by_id(task_id)
            .await
            .map_err(internal)?
            .ok_or(CoreError::NotFound {
                entity: "RecoveryTask",
                id: task_id,
            })?;

        match TaskStatus::from_id(task.status_id) {
            Some(TaskStatus::Running) => {
                return Err(CoreError::Conflict("drill is already running".into()))
            }
            Some(TaskStatus::Success) => {
                return Err(CoreError::Conflict("drill already succeeded".into()))
            }
            _ if !state_machine::can_execute(task.status_id) => {
                return Err(CoreError::Conflict(format!(
                    "cannot execute a drill in status {}",
                    state_machine::status_name(task.status_id)
                )))
            }
            _ => {}
        }

        if !self
            .store
            .try_mark_running(task_id)
            .await
            .map_err(internal)?
        {
            // Lost the race against a concurrent execute.
            return Err(CoreError::Conflict("drill is already running".into()));
        }

        self.running.insert(
            task_id,
            RunningEntry {
                started_at: self.clock.now(),
                actor,
            },
        );

        tracing::info!(task_id, actor, "Recovery drill started");

        let this = self.clone();
        tokio::spawn(async move {
            this.perform_recovery(task, actor).await;
        });

        Ok(ExecuteReceipt {
            task_id,
            status_id: TaskStatus::Running.id(),
        })
    }

    /// The detached pipeline: run the phases, then write exactly one
    /// terminal state and its audit event.
    async fn perform_recovery(self, task: RecoveryTask, actor: DbId) {
        let task_id = task.id;
        let task_name = task.task_name.clone();
        let outcome = self.run_phases(&task).await;
        self.running.remove(task_id);

        match outcome {
            Ok(PhaseOutcome::Verified(report)) => {
                match self.store.complete(task_id, &report).await {
                    Ok(true) => {
                        tracing::info!(task_id, "Recovery drill succeeded");
                        self.record_execute_outcome(
                            actor,
                            task_id,
                            &task_name,
                            operation_status::SUCCESS,
                            "drill completed; data verification passed",
                        )
                        .await;
                    }
                    Ok(false) => {
                        tracing::debug!(task_id, "Completion write skipped: task left Running");
                    }
                    Err(e) => {
                        tracing::error!(task_id, error = %e, "Failed to persist drill completion");
                    }
                }
            }
            Ok(PhaseOutcome::ValidationFailed(report)) => {
                self.write_failure(actor, task_id, &task_name, "data validation failed", Some(&report))
                    .await;
            }
            Err(PhaseError::Fail(msg)) => {
                self.write_failure(actor, task_id, &task_name, &msg, None).await;
            }
            Err(PhaseError::Ceiling(msg)) => {
                match self.store.timeout(task_id, &msg).await {
                    Ok(true) => {
                        tracing::warn!(task_id, error = %msg, "Recovery drill timed out");
                        self.record_execute_outcome(
                            actor,
                            task_id,
                            &task_name,
                            operation_status::FAILED,
                            msg,
                        )
                        .await;
                    }
                    Ok(false) => {
                        tracing::debug!(task_id, "Timeout write skipped: task left Running");
                    }
                    Err(e) => {
                        tracing::error!(task_id, error = %e, "Failed to persist drill timeout");
                    }
                }
            }
            Err(PhaseError::Interrupted) => {
                tracing::info!(task_id, "Pipeline stopped: task is no longer Running");
            }
            Err(PhaseError::Store(e)) => {
                tracing::error!(task_id, error = %e, "Pipeline aborted: task store unavailable");
            }
        }
    }

    /// Clone, wait for ready, validate. Progress writes double as the
    /// cancellation guard: each is conditional on the task still being
    /// Running, and the first one that does not apply stops the pipeline.
    async fn run_phases(&self, task: &RecoveryTask) -> Result<PhaseOutcome, PhaseError> {
        let task_id = task.id;

        // --- Phase 1: clone -------------------------------------------------
        applied(
            self.store
                .update_progress(task_id, drill::PROGRESS_CLONE_REQUESTED)
                .await?,
        )?;

        let source = self
            .store
            .find_instance(task.source_instance_id)
            .await?
            .ok_or_else(|| {
                PhaseError::Fail(format!(
                    "source instance {} is no longer registered",
                    task.source_instance_id
                ))
            })?;

        let backup = backup_selector(task)?;
        let request = CloneRequest {
            source_instance_id: source.provider_instance_id.clone(),
            target_name: task.target_instance_name.clone(),
            backup,
            instance_class: task
                .instance_class
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTANCE_CLASS.to_string()),
            storage_size_gb: task.storage_size_gb.unwrap_or(DEFAULT_STORAGE_GB),
        };

        let receipt = self
            .provider
            .clone_instance(&request)
            .await
            .map_err(|e| PhaseError::Fail(format!("clone request failed: {e}")))?;

        tracing::info!(
            task_id,
            target_instance_id = %receipt.target_instance_id,
            "Clone accepted by provider",
        );

        applied(
            self.store
                .set_target_instance(task_id, &receipt.target_instance_id)
                .await?,
        )?;
        applied(
            self.store
                .update_progress(task_id, drill::PROGRESS_CLONE_ACCEPTED)
                .await?,
        )?;

        // --- Phase 2: wait for the target to come up ------------------------
        let wait_started = self.clock.now();
        loop {
            let description = self
                .provider
                .get_instance(&receipt.target_instance_id)
                .await
                .map_err(|e| PhaseError::Fail(format!("instance status poll failed: {e}")))?;

            if description.as_ref().is_some_and(|d| d.is_running()) {
                break;
            }

            let elapsed = (self.clock.now() - wait_started).to_std().unwrap_or_default();
            if elapsed >= self.config.ready_wait_ceiling {
                return Err(PhaseError::Ceiling(format!(
                    "target instance was not ready within {} minutes",
                    self.config.ready_wait_ceiling.as_secs() / 60
                )));
            }

            applied(
                self.store
                    .update_progress(
                        task_id,
                        wait_phase_progress(
                            elapsed.as_secs(),
                            self.config.ready_wait_ceiling.as_secs(),
                        ),
                    )
                    .await?,
            )?;

            tokio::time::sleep(self.config.ready_poll_interval).await;
        }

        applied(
            self.store
                .update_progress(task_id, drill::PROGRESS_INSTANCE_READY)
                .await?,
        )?;

        // --- Phase 3: validate restored data --------------------------------
        applied(self.store.mark_verifying(task_id).await?)?;

        let rules = task
            .validation_rules
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let report = self
            .provider
            .validate_data(&receipt.target_instance_id, &rules)
            .await
            .map_err(|e| PhaseError::Fail(format!("data validation call failed: {e}")))?;

        // Stored verbatim; the success flag decides the terminal state.
        let payload = serde_json::to_value(&report)
            .unwrap_or_else(|_| serde_json::json!({ "success": report.success }));

        if report.success {
            Ok(PhaseOutcome::Verified(payload))
        } else {
            Ok(PhaseOutcome::ValidationFailed(payload))
        }
    }

    /// Write the Failed terminal state and its audit event.
    async fn write_failure(
        &self,
        actor: DbId,
        task_id: DbId,
        task_name: &str,
        message: &str,
        report: Option<&serde_json::Value>,
    ) {
        match self.store.fail(task_id, message, report).await {
            Ok(true) => {
                tracing::warn!(task_id, error = %message, "Recovery drill failed");
                self.record_execute_outcome(
                    actor,
                    task_id,
                    task_name,
                    operation_status::FAILED,
                    message,
                )
                .await;
            }
            Ok(false) => {
                tracing::debug!(task_id, "Failure write skipped: task left Running");
            }
            Err(e) => {
                tracing::error!(task_id, error = %e, "Failed to persist drill failure");
            }
        }
    }

    async fn record_execute_outcome(
        &self,
        actor: DbId,
        task_id: DbId,
        task_name: &str,
        status: &str,
        description: impl Into<String>,
    ) {
        self.audit
            .record(AuditEvent::for_task(
                actor,
                task_id,
                task_name,
                operation_types::EXECUTE,
                status,
                description,
            ))
            .await;
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancel a Pending or Running drill.
    ///
    /// Cancellation is cooperative: an in-flight provider call is not
    /// interrupted, but the pipeline's next conditional write will see the
    /// task is no longer Running and stop.
    pub async fn cancel_task(&self, task_id: DbId, actor: DbId) -> Result<RecoveryTask, CoreError> {
        let task = self
            .store
            .find_by_id(task_id)
            .await
            .map_err(internal)?
            .ok_or(CoreError::NotFound {
                entity: "RecoveryTask",
                id: task_id,
            })?;

        if !state_machine::can_cancel(task.status_id) {
            return Err(CoreError::Conflict(format!(
                "cannot cancel a drill in status {}",
                state_machine::status_name(task.status_id)
            )));
        }

        if !self.store.cancel(task_id).await.map_err(internal)? {
            // Reached a terminal state between the read and the write.
            return Err(CoreError::Conflict("cannot cancel a finished drill".into()));
        }

        self.running.remove(task_id);
        tracing::info!(task_id, actor, "Recovery drill cancelled");

        self.audit
            .record(AuditEvent::for_task(
                actor,
                task_id,
                &task.task_name,
                operation_types::UPDATE,
                operation_status::SUCCESS,
                "drill cancelled by user",
            ))
            .await;

        self.store
            .find_by_id(task_id)
            .await
            .map_err(internal)?
            .ok_or(CoreError::NotFound {
                entity: "RecoveryTask",
                id: task_id,
            })
    }

    // -----------------------------------------------------------------------
    // Reads and administration
    // -----------------------------------------------------------------------

    /// Store pass-through: fetch one task.
    pub async fn get_task(&self, task_id: DbId) -> Result<RecoveryTask, CoreError> {
        self.store
            .find_by_id(task_id)
            .await
            .map_err(internal)?
            .ok_or(CoreError::NotFound {
                entity: "RecoveryTask",
                id: task_id,
            })
    }

    /// Store pass-through: list tasks with filters.
    pub async fn list_tasks(&self, query: &TaskListQuery) -> Result<Vec<RecoveryTask>, CoreError> {
        self.store.list(query).await.map_err(internal)
    }

    /// Status tally under the given filter predicate.
    pub async fn statistics(&self, filter: &TaskStatsFilter) -> Result<TaskStatistics, CoreError> {
        let counts = self.store.count_by_status(filter).await.map_err(internal)?;
        Ok(TaskStatistics::from_counts(&counts))
    }

    /// Administrative delete. Refused while the drill is Running.
    pub async fn delete_task(&self, task_id: DbId, actor: DbId) -> Result<(), CoreError> {
        let task = self
            .store
            .find_by_id(task_id)
            .await
            .map_err(internal)?
            .ok_or(CoreError::NotFound {
                entity: "RecoveryTask",
                id: task_id,
            })?;

        if task.status_id == TaskStatus::Running.id() {
            return Err(CoreError::Conflict("cannot delete a running drill".into()));
        }

        if !self.store.delete(task_id).await.map_err(internal)? {
            return Err(CoreError::Conflict("cannot delete a running drill".into()));
        }

        self.audit
            .record(AuditEvent::for_task(
                actor,
                task_id,
                &task.task_name,
                operation_types::DELETE,
                operation_status::SUCCESS,
                "recovery drill deleted",
            ))
            .await;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sweep bodies
    // -----------------------------------------------------------------------

    /// Launch all Pending drills whose scheduled time has arrived.
    ///
    /// Each drill is executed as its original creator. Per-task failures are
    /// logged and do not block the rest of the sweep.
    pub async fn run_due_tasks(&self) -> Result<usize, StoreError> {
        let due = self.store.due_scheduled(self.clock.now()).await?;
        let mut launched = 0;
        for task in due {
            match self.execute_task(task.id, task.created_by).await {
                Ok(_) => launched += 1,
                Err(e) => {
                    tracing::warn!(task_id = task.id, error = %e, "Skipping due drill");
                }
            }
        }
        Ok(launched)
    }

    /// Time out every registered drill that has been Running longer than the
    /// stuck ceiling. The only path that produces the Timeout state besides
    /// the wait-for-ready ceiling.
    pub async fn reap_stuck_tasks(&self) -> usize {
        let now = self.clock.now();
        let mut reaped = 0;

        for (task_id, entry) in self.running.snapshot() {
            let elapsed = (now - entry.started_at).to_std().unwrap_or_default();
            if elapsed < self.config.stuck_ceiling {
                continue;
            }

            match self.store.timeout(task_id, MSG_EXECUTION_TIMED_OUT).await {
                Ok(true) => {
                    self.running.remove(task_id);
                    reaped += 1;
                    tracing::warn!(
                        task_id,
                        elapsed_secs = elapsed.as_secs(),
                        "Reaped stuck drill",
                    );
                    if let Ok(Some(task)) = self.store.find_by_id(task_id).await {
                        self.record_execute_outcome(
                            entry.actor,
                            task_id,
                            &task.task_name,
                            operation_status::FAILED,
                            MSG_EXECUTION_TIMED_OUT,
                        )
                        .await;
                    }
                }
                Ok(false) => {
                    // Already terminal; the entry is stale bookkeeping.
                    self.running.remove(task_id);
                }
                Err(e) => {
                    tracing::error!(task_id, error = %e, "Failed to reap stuck drill");
                }
            }
        }

        reaped
    }
}

/// Cross-field task spec validation shared by API and scheduler creates.
fn validate_spec(input: &CreateRecoveryTask) -> Result<(), CoreError> {
    let restore_type = RestoreType::from_id(input.restore_type_id).ok_or_else(|| {
        CoreError::Validation(format!("unknown restore type {}", input.restore_type_id))
    })?;
    let task_type = TaskType::from_id(input.task_type_id).ok_or_else(|| {
        CoreError::Validation(format!("unknown task type {}", input.task_type_id))
    })?;

    match restore_type {
        RestoreType::BackupSet if input.backup_id.is_none() => {
            return Err(CoreError::Validation(
                "backup_id is required for backup-set restores".into(),
            ))
        }
        RestoreType::PointInTime if input.restore_time.is_none() => {
            return Err(CoreError::Validation(
                "restore_time is required for point-in-time restores".into(),
            ))
        }
        _ => {}
    }

    if input.is_annual_task && input.compliance_year.is_none() {
        return Err(CoreError::Validation(
            "compliance_year is required for annual drills".into(),
        ));
    }

    if task_type == TaskType::Scheduled && input.scheduled_at.is_none() {
        return Err(CoreError::Validation(
            "scheduled_at is required for scheduled drills".into(),
        ));
    }

    Ok(())
}

/// Pick the backup selector from the task's immutable fields.
fn backup_selector(task: &RecoveryTask) -> Result<BackupSelector, PhaseError> {
    match RestoreType::from_id(task.restore_type_id) {
        Some(RestoreType::BackupSet) => {
            let backup_id = task
                .backup_id
                .clone()
                .ok_or_else(|| PhaseError::Fail("task has no backup id".into()))?;
            Ok(BackupSelector::BackupSet { backup_id })
        }
        Some(RestoreType::PointInTime) => {
            let restore_time = task
                .restore_time
                .ok_or_else(|| PhaseError::Fail("task has no restore time".into()))?;
            Ok(BackupSelector::PointInTime { restore_time })
        }
        None => Err(PhaseError::Fail(format!(
            "unknown restore type {}",
            task.restore_type_id
        ))),
    }
}

fn internal(err: StoreError) -> CoreError {
    CoreError::Internal(err.to_string())
}
