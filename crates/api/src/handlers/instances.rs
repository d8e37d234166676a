//! Handlers for the read-only `/instances` registry surface.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use bcp_core::types::DbId;
use bcp_core::CoreError;
use bcp_db::models::rds_instance::InstanceListQuery;
use bcp_db::repositories::InstanceRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /instances
pub async fn list_instances(
    State(state): State<AppState>,
    Query(query): Query<InstanceListQuery>,
) -> AppResult<impl IntoResponse> {
    let instances = InstanceRepo::list(&state.pool, &query).await?;
    Ok(Json(DataResponse { data: instances }))
}

/// GET /instances/{id}
pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = InstanceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "RdsInstance",
            id,
        })?;
    Ok(Json(DataResponse { data: instance }))
}
