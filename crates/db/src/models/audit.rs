//! Audit trail entity models and DTOs.
//!
//! Audit entries are append-only and immutable once created (no
//! `updated_at`). Entries chain integrity hashes so tampering with the trail
//! is detectable.

use bcp_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single audit entry. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub timestamp: Timestamp,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<DbId>,
    pub resource_name: Option<String>,
    pub operation_type: String,
    pub status: String,
    pub description: Option<String>,
    pub risk_level: String,
    pub integrity_hash: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new audit entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLog {
    pub actor_id: Option<DbId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<DbId>,
    pub resource_name: Option<String>,
    pub operation_type: String,
    pub status: String,
    pub description: Option<String>,
    pub risk_level: String,
    pub integrity_hash: Option<String>,
}

/// Filter parameters for querying the audit trail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<DbId>,
    pub resource_type: Option<String>,
    pub resource_id: Option<DbId>,
    pub operation_type: Option<String>,
    pub risk_level: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
