//! In-memory test doubles for the engine's ports.
//!
//! `MemoryTaskStore` mirrors the conditional-update semantics of the real
//! repository: every transition checks the current status and reports
//! whether it applied, and progress writes are recorded so tests can assert
//! monotonicity.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bcp_cloud::{
    CloneReceipt, CloneRequest, InstanceDescription, ProviderError, RdsProvider, ValidationReport,
};
use bcp_core::types::{DbId, Timestamp};
use bcp_db::models::rds_instance::RdsInstance;
use bcp_db::models::recovery_task::{
    CreateRecoveryTask, RecoveryTask, TaskListQuery, TaskStatsFilter,
};
use bcp_db::models::status::{StatusId, TaskStatus, TaskType, VerificationStatus};
use bcp_engine::{
    AuditEvent, AuditSink, Clock, EngineConfig, RecoveryOrchestrator, StoreError, TaskStore,
};

// ---------------------------------------------------------------------------
// Task store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<DbId, RecoveryTask>>,
    instances: Mutex<HashMap<DbId, RdsInstance>>,
    next_id: AtomicI64,
    progress_log: Mutex<HashMap<DbId, Vec<i16>>>,
    poisoned: Mutex<Option<DbId>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Register a source instance the store will report as existing.
    pub fn add_instance(&self, id: DbId, provider_instance_id: &str) {
        let now = chrono::Utc::now();
        self.instances.lock().unwrap().insert(
            id,
            RdsInstance {
                id,
                provider_instance_id: provider_instance_id.to_string(),
                name: format!("instance-{id}"),
                engine: "mysql".into(),
                engine_version: "8.0".into(),
                status: "Running".into(),
                region: "cn-east-1".into(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn get(&self, id: DbId) -> RecoveryTask {
        self.tasks.lock().unwrap().get(&id).cloned().expect("task exists")
    }

    pub fn status_of(&self, id: DbId) -> Option<StatusId> {
        self.tasks.lock().unwrap().get(&id).map(|t| t.status_id)
    }

    /// Force a status, bypassing the state machine (fixture setup only).
    pub fn force_status(&self, id: DbId, status: TaskStatus) {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.get_mut(&id).expect("task exists").status_id = status.id();
    }

    /// Every progress value ever written for the task, in write order.
    pub fn progress_history(&self, id: DbId) -> Vec<i16> {
        self.progress_log
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make `try_mark_running` error for one task, to exercise the sweeps'
    /// per-task failure isolation.
    pub fn poison_mark_running(&self, id: DbId) {
        *self.poisoned.lock().unwrap() = Some(id);
    }

    fn log_progress(&self, id: DbId, value: i16) {
        self.progress_log.lock().unwrap().entry(id).or_default().push(value);
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(
        &self,
        input: &CreateRecoveryTask,
        created_by: DbId,
    ) -> Result<RecoveryTask, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now();
        let task = RecoveryTask {
            id,
            task_name: input.task_name.clone(),
            source_instance_id: input.source_instance_id,
            target_instance_name: input.target_instance_name.clone(),
            restore_type_id: input.restore_type_id,
            backup_id: input.backup_id.clone(),
            restore_time: input.restore_time,
            task_type_id: input.task_type_id,
            is_annual_task: input.is_annual_task,
            compliance_year: input.compliance_year,
            scheduled_at: input.scheduled_at,
            instance_class: input.instance_class.clone(),
            storage_size_gb: input.storage_size_gb,
            validation_rules: input.validation_rules.clone(),
            created_by,
            status_id: TaskStatus::Pending.id(),
            progress: 0,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            error_message: None,
            verification_status_id: VerificationStatus::Pending.id(),
            verification_result: None,
            target_instance_id: None,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().insert(id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<RecoveryTask>, StoreError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, query: &TaskListQuery) -> Result<Vec<RecoveryTask>, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        let mut matched: Vec<RecoveryTask> = tasks
            .values()
            .filter(|t| query.status_id.is_none_or(|s| t.status_id == s))
            .filter(|t| query.task_type_id.is_none_or(|s| t.task_type_id == s))
            .filter(|t| query.compliance_year.is_none_or(|y| t.compliance_year == Some(y)))
            .filter(|t| query.source_instance_id.is_none_or(|i| t.source_instance_id == i))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(50).clamp(1, 200) as usize;
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_by_status(
        &self,
        filter: &TaskStatsFilter,
    ) -> Result<Vec<(StatusId, i64)>, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        let mut counts: HashMap<StatusId, i64> = HashMap::new();
        for task in tasks.values() {
            if filter.task_type_id.is_some_and(|t| task.task_type_id != t) {
                continue;
            }
            if filter.compliance_year.is_some_and(|y| task.compliance_year != Some(y)) {
                continue;
            }
            if filter
                .source_instance_id
                .is_some_and(|i| task.source_instance_id != i)
            {
                continue;
            }
            *counts.entry(task.status_id).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn has_active_annual(
        &self,
        source_instance_id: DbId,
        compliance_year: i32,
    ) -> Result<bool, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.values().any(|t| {
            t.source_instance_id == source_instance_id
                && t.compliance_year == Some(compliance_year)
                && t.is_annual_task
                && TaskStatus::ANNUAL_BLOCKING.contains(&t.status_id)
        }))
    }

    async fn find_instance(&self, id: DbId) -> Result<Option<RdsInstance>, StoreError> {
        Ok(self.instances.lock().unwrap().get(&id).cloned())
    }

    async fn try_mark_running(&self, id: DbId) -> Result<bool, StoreError> {
        if *self.poisoned.lock().unwrap() == Some(id) {
            return Err(StoreError("injected failure".into()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Pending.id() && task.status_id != TaskStatus::Failed.id() {
            return Ok(false);
        }
        task.status_id = TaskStatus::Running.id();
        task.started_at = Some(chrono::Utc::now());
        task.progress = 0;
        task.completed_at = None;
        task.duration_seconds = None;
        task.error_message = None;
        task.verification_status_id = VerificationStatus::Pending.id();
        task.verification_result = None;
        task.target_instance_id = None;
        drop(tasks);
        self.log_progress(id, 0);
        Ok(true)
    }

    async fn update_progress(&self, id: DbId, percent: i16) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        task.progress = task.progress.max(percent);
        let written = task.progress;
        drop(tasks);
        self.log_progress(id, written);
        Ok(true)
    }

    async fn set_target_instance(&self, id: DbId, target: &str) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        task.target_instance_id = Some(target.to_string());
        Ok(true)
    }

    async fn mark_verifying(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        task.verification_status_id = VerificationStatus::InProgress.id();
        task.progress = task.progress.max(bcp_core::drill::PROGRESS_VALIDATING);
        let written = task.progress;
        drop(tasks);
        self.log_progress(id, written);
        Ok(true)
    }

    async fn complete(
        &self,
        id: DbId,
        verification_result: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        let now = chrono::Utc::now();
        task.status_id = TaskStatus::Success.id();
        task.progress = 100;
        task.completed_at = Some(now);
        task.duration_seconds = task
            .started_at
            .map(|s| bcp_core::drill::duration_seconds(s, now));
        task.verification_status_id = VerificationStatus::Passed.id();
        task.verification_result = Some(verification_result.clone());
        drop(tasks);
        self.log_progress(id, 100);
        Ok(true)
    }

    async fn fail(
        &self,
        id: DbId,
        error: &str,
        verification_result: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        let now = chrono::Utc::now();
        task.status_id = TaskStatus::Failed.id();
        task.completed_at = Some(now);
        task.duration_seconds = task
            .started_at
            .map(|s| bcp_core::drill::duration_seconds(s, now));
        task.error_message = Some(error.to_string());
        task.verification_status_id = VerificationStatus::Failed.id();
        if let Some(result) = verification_result {
            task.verification_result = Some(result.clone());
        }
        Ok(true)
    }

    async fn cancel(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Pending.id() && task.status_id != TaskStatus::Running.id()
        {
            return Ok(false);
        }
        task.status_id = TaskStatus::Cancelled.id();
        task.completed_at = Some(chrono::Utc::now());
        task.error_message = Some("cancelled by user".to_string());
        Ok(true)
    }

    async fn timeout(&self, id: DbId, error: &str) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };
        if task.status_id != TaskStatus::Running.id() {
            return Ok(false);
        }
        let now = chrono::Utc::now();
        task.status_id = TaskStatus::Timeout.id();
        task.completed_at = Some(now);
        task.duration_seconds = task
            .started_at
            .map(|s| bcp_core::drill::duration_seconds(s, now));
        task.error_message = Some(error.to_string());
        task.verification_status_id = VerificationStatus::Failed.id();
        Ok(true)
    }

    async fn due_scheduled(&self, now: Timestamp) -> Result<Vec<RecoveryTask>, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        let mut due: Vec<RecoveryTask> = tasks
            .values()
            .filter(|t| {
                t.status_id == TaskStatus::Pending.id()
                    && t.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|t| t.scheduled_at);
        Ok(due)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(&id) {
            Some(task) if task.status_id != TaskStatus::Running.id() => {
                tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Scripted provider double. All knobs use interior mutability so tests can
/// change behaviour between executes (e.g. fail validation, then retry).
pub struct ScriptedRds {
    pub target_id: String,
    pub fail_clone: Mutex<Option<String>>,
    /// How many get-instance polls return a non-Running status before the
    /// target reports Running. `usize::MAX` never becomes ready.
    pub ready_after_polls: AtomicUsize,
    pub polls: AtomicUsize,
    pub fail_validate: Mutex<Option<String>>,
    pub validation_success: AtomicBool,
    pub validation_details: serde_json::Value,
}

impl Default for ScriptedRds {
    fn default() -> Self {
        Self {
            target_id: "tgt-1".into(),
            fail_clone: Mutex::new(None),
            ready_after_polls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            fail_validate: Mutex::new(None),
            validation_success: AtomicBool::new(true),
            validation_details: serde_json::json!({ "rows_checked": 42 }),
        }
    }
}

impl ScriptedRds {
    pub fn never_ready() -> Self {
        let provider = Self::default();
        provider.ready_after_polls.store(usize::MAX, Ordering::SeqCst);
        provider
    }

    pub fn failing_validation() -> Self {
        let provider = Self::default();
        provider.validation_success.store(false, Ordering::SeqCst);
        provider
    }
}

fn provider_error(message: &str) -> ProviderError {
    ProviderError::Api {
        status: 500,
        body: message.to_string(),
    }
}

#[async_trait]
impl RdsProvider for ScriptedRds {
    async fn get_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceDescription>, ProviderError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let status = if poll >= self.ready_after_polls.load(Ordering::SeqCst) {
            "Running"
        } else {
            "Creating"
        };
        Ok(Some(InstanceDescription {
            instance_id: instance_id.to_string(),
            status: status.to_string(),
            engine: "mysql".into(),
            engine_version: "8.0".into(),
        }))
    }

    async fn clone_instance(&self, _request: &CloneRequest) -> Result<CloneReceipt, ProviderError> {
        if let Some(message) = self.fail_clone.lock().unwrap().clone() {
            return Err(provider_error(&message));
        }
        Ok(CloneReceipt {
            target_instance_id: self.target_id.clone(),
        })
    }

    async fn validate_data(
        &self,
        _instance_id: &str,
        _rules: &serde_json::Value,
    ) -> Result<ValidationReport, ProviderError> {
        if let Some(message) = self.fail_validate.lock().unwrap().clone() {
            return Err(provider_error(&message));
        }
        Ok(ValidationReport {
            success: self.validation_success.load(Ordering::SeqCst),
            details: self.validation_details.clone(),
        })
    }

    async fn delete_instance(&self, _instance_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Audit sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(chrono::Utc::now()),
        }
    }

    /// Inherent accessor so tests do not need the `Clock` trait in scope.
    pub fn now(&self) -> Timestamp {
        *self.current.lock().unwrap()
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut current = self.current.lock().unwrap();
        *current += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        ManualClock::now(self)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryTaskStore>,
    pub provider: Arc<ScriptedRds>,
    pub audit: Arc<MemoryAuditSink>,
    pub clock: Arc<ManualClock>,
    pub orchestrator: RecoveryOrchestrator,
}

/// Build an orchestrator over in-memory doubles with a millisecond poll
/// interval so pipelines finish within a test run.
pub fn harness(provider: ScriptedRds) -> Harness {
    let store = Arc::new(MemoryTaskStore::new());
    let provider = Arc::new(provider);
    let audit = Arc::new(MemoryAuditSink::default());
    let clock = Arc::new(ManualClock::new());
    let config = EngineConfig {
        ready_poll_interval: Duration::from_millis(5),
        ..EngineConfig::default()
    };
    let orchestrator = RecoveryOrchestrator::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::clone(&provider) as Arc<dyn RdsProvider>,
        Arc::clone(&audit) as Arc<dyn AuditSink>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        config,
    );
    Harness {
        store,
        provider,
        audit,
        clock,
        orchestrator,
    }
}

/// Poll the store until the task reaches the given status, or panic.
pub async fn wait_for_status(store: &MemoryTaskStore, id: DbId, status: TaskStatus) {
    for _ in 0..400 {
        if store.status_of(id) == Some(status.id()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "task {id} never reached status {:?} (currently {:?})",
        status,
        store.status_of(id)
    );
}

// ---------------------------------------------------------------------------
// DTO builders
// ---------------------------------------------------------------------------

/// Manual backup-set drill against the given instance.
pub fn backup_set_task(instance: DbId) -> CreateRecoveryTask {
    CreateRecoveryTask {
        task_name: "drill".into(),
        source_instance_id: instance,
        target_instance_name: "drill-target".into(),
        restore_type_id: bcp_db::models::status::RestoreType::BackupSet.id(),
        backup_id: Some("bk-1".into()),
        restore_time: None,
        task_type_id: TaskType::Manual.id(),
        is_annual_task: false,
        compliance_year: None,
        scheduled_at: None,
        instance_class: None,
        storage_size_gb: None,
        validation_rules: None,
    }
}

/// Annual compliance drill for the given year.
pub fn annual_task(instance: DbId, year: i32) -> CreateRecoveryTask {
    CreateRecoveryTask {
        task_name: format!("annual-drill-{year}"),
        task_type_id: TaskType::Annual.id(),
        is_annual_task: true,
        compliance_year: Some(year),
        ..backup_set_task(instance)
    }
}

/// Scheduled drill due at the given time.
pub fn scheduled_task(instance: DbId, at: Timestamp) -> CreateRecoveryTask {
    CreateRecoveryTask {
        task_name: "scheduled-drill".into(),
        task_type_id: TaskType::Scheduled.id(),
        scheduled_at: Some(at),
        ..backup_set_task(instance)
    }
}
