//! RDS instance registry models.
//!
//! The platform does not own these instances; rows mirror what the cloud
//! provider reports so drills can reference a source instance by ID.

use bcp_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rds_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RdsInstance {
    pub id: DbId,
    /// Provider-side instance identifier (e.g. `rm-bp1xxxx`).
    pub provider_instance_id: String,
    pub name: String,
    pub engine: String,
    pub engine_version: String,
    pub status: String,
    pub region: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for `GET /api/v1/instances`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceListQuery {
    pub engine: Option<String>,
    pub region: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
