//! Repository for the append-only `audit_logs` table.

use bcp_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, timestamp, actor_id, action, resource_type, resource_id, \
    resource_name, operation_type, status, description, risk_level, \
    integrity_hash, created_at";

/// Column list for INSERT (excludes auto-generated `id`, `timestamp`,
/// `created_at`).
const INSERT_COLUMNS: &str = "\
    actor_id, action, resource_type, resource_id, resource_name, \
    operation_type, status, description, risk_level, integrity_hash";

/// Provides insert and query operations for the audit trail.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Insert a single audit entry.
    pub async fn insert(pool: &PgPool, entry: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.actor_id)
            .bind(&entry.action)
            .bind(&entry.resource_type)
            .bind(entry.resource_id)
            .bind(&entry.resource_name)
            .bind(&entry.operation_type)
            .bind(&entry.status)
            .bind(&entry.description)
            .bind(&entry.risk_level)
            .bind(&entry.integrity_hash)
            .fetch_one(pool)
            .await
    }

    /// Find the integrity hash of the most recent entry, for chaining.
    pub async fn find_last_hash(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
        .map(|opt| opt.flatten())
    }

    /// Query audit entries with filtering and pagination, newest first.
    pub async fn query(pool: &PgPool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0).max(0);

        let (where_clause, bind_values, bind_idx) = build_audit_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY timestamp DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let q = bind_audit_values(sqlx::query_as::<_, AuditLog>(&query), &bind_values);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count audit entries matching the given filter (pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_audit_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT FROM audit_logs {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &bind_values {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.clone()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built audit queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from `AuditQuery` filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. The
/// `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_audit_filter(params: &AuditQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(actor_id) = params.actor_id {
        conditions.push(format!("actor_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(actor_id));
    }

    if let Some(ref resource_type) = params.resource_type {
        conditions.push(format!("resource_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(resource_type.clone()));
    }

    if let Some(resource_id) = params.resource_id {
        conditions.push(format!("resource_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(resource_id));
    }

    if let Some(ref operation_type) = params.operation_type {
        conditions.push(format!("operation_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(operation_type.clone()));
    }

    if let Some(ref risk_level) = params.risk_level {
        conditions.push(format!("risk_level = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(risk_level.clone()));
    }

    if let Some(from) = params.from {
        conditions.push(format!("timestamp >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = params.to {
        conditions.push(format!("timestamp <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

/// Apply typed bind values to a query-as builder in order.
fn bind_audit_values<'q>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, AuditLog, sqlx::postgres::PgArguments>,
    values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, AuditLog, sqlx::postgres::PgArguments> {
    for value in values {
        q = match value {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v),
            BindValue::Timestamp(v) => q.bind(*v),
        };
    }
    q
}
