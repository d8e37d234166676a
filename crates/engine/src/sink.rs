//! Audit sink port.
//!
//! Recording is fire-and-forget: implementations must never propagate a
//! persistence failure back into the operation being audited.

use async_trait::async_trait;
use bcp_core::audit::{compute_integrity_hash, risk_level_for};
use bcp_core::types::DbId;
use bcp_db::models::audit::CreateAuditLog;
use bcp_db::repositories::AuditLogRepo;
use bcp_db::DbPool;

/// A structured orchestrator event for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: Option<DbId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<DbId>,
    pub resource_name: Option<String>,
    pub operation_type: String,
    pub status: String,
    pub description: Option<String>,
    pub risk_level: String,
}

impl AuditEvent {
    /// Build an event for a recovery task operation.
    ///
    /// The risk level is derived from the operation/outcome pair, so callers
    /// cannot accidentally under-classify a failed execution.
    pub fn for_task(
        actor_id: DbId,
        task_id: DbId,
        task_name: &str,
        operation_type: &str,
        status: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: Some(actor_id),
            action: format!("recovery_task.{operation_type}"),
            resource_type: bcp_core::audit::resource_types::RECOVERY_TASK.to_string(),
            resource_id: Some(task_id),
            resource_name: Some(task_name.to_string()),
            operation_type: operation_type.to_string(),
            status: status.to_string(),
            description: Some(description.into()),
            risk_level: risk_level_for(operation_type, status).to_string(),
        }
    }
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an event. Must not fail the triggering operation; log and
    /// continue on persistence errors.
    async fn record(&self, event: AuditEvent);
}

/// Production sink writing to the `audit_logs` table with hash chaining.
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: AuditEvent) {
        let prev_hash = match AuditLogRepo::find_last_hash(&self.pool).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(error = %e, "Audit chain lookup failed; recording unchained entry");
                None
            }
        };

        let entry_data = format!(
            "{}|{}|{}|{}|{}",
            event.action,
            event.resource_id.unwrap_or(0),
            event.operation_type,
            event.status,
            event.description.as_deref().unwrap_or(""),
        );
        let integrity_hash = compute_integrity_hash(prev_hash.as_deref(), &entry_data);

        let entry = CreateAuditLog {
            actor_id: event.actor_id,
            action: event.action.clone(),
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            resource_name: event.resource_name,
            operation_type: event.operation_type,
            status: event.status,
            description: event.description,
            risk_level: event.risk_level,
            integrity_hash: Some(integrity_hash),
        };

        if let Err(e) = AuditLogRepo::insert(&self.pool, &entry).await {
            tracing::error!(
                action = %event.action,
                error = %e,
                "Failed to record audit event",
            );
        }
    }
}
