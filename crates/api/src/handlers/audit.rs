//! Handlers for the audit trail endpoints consumed by the compliance
//! dashboard.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use bcp_db::models::audit::AuditQuery;
use bcp_db::repositories::AuditLogRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::PageResponse;
use crate::state::AppState;

/// Query parameters for audit trail queries.
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub actor_id: Option<i64>,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub operation_type: Option<String>,
    pub risk_level: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parse an optional ISO 8601 timestamp string.
fn parse_timestamp(
    value: &Option<String>,
) -> AppResult<Option<chrono::DateTime<chrono::Utc>>> {
    match value {
        Some(v) => v
            .parse::<chrono::DateTime<chrono::Utc>>()
            .map(Some)
            .map_err(|_| AppError::BadRequest("Invalid date format".into())),
        None => Ok(None),
    }
}

/// GET /audit-logs
///
/// Query the audit trail with filters and pagination.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> AppResult<impl IntoResponse> {
    let query = AuditQuery {
        actor_id: params.actor_id,
        resource_type: params.resource_type,
        resource_id: params.resource_id,
        operation_type: params.operation_type,
        risk_level: params.risk_level,
        from: parse_timestamp(&params.from)?,
        to: parse_timestamp(&params.to)?,
        limit: params.limit,
        offset: params.offset,
    };

    let entries = AuditLogRepo::query(&state.pool, &query).await?;
    let total = AuditLogRepo::count(&state.pool, &query).await?;

    Ok(Json(PageResponse {
        data: entries,
        total,
    }))
}
