//! Handlers for the `/recovery-tasks` resource.
//!
//! Create, execute, and cancel go through the orchestrator; reads are store
//! pass-throughs. Execute returns immediately with the Running receipt while
//! the pipeline continues in the background -- pipeline failures never
//! surface here, they land on the task record.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bcp_core::types::DbId;
use bcp_db::models::recovery_task::{CreateRecoveryTask, TaskListQuery, TaskStatsFilter};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::ActorId;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /recovery-tasks
///
/// Create a new drill in Pending status. No provider side effects yet.
pub async fn create_task(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(input): Json<CreateRecoveryTask>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let task = state.orchestrator.create_task(&input, actor).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /recovery-tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> AppResult<impl IntoResponse> {
    let tasks = state.orchestrator.list_tasks(&query).await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /recovery-tasks/statistics
pub async fn task_statistics(
    State(state): State<AppState>,
    Query(filter): Query<TaskStatsFilter>,
) -> AppResult<impl IntoResponse> {
    let stats = state.orchestrator.statistics(&filter).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /recovery-tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = state.orchestrator.get_task(id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /recovery-tasks/{id}/execute
///
/// Returns `202 Accepted` with `{task_id, status_id}`; the drill pipeline
/// runs detached.
pub async fn execute_task(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.orchestrator.execute_task(id, actor).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: receipt })))
}

/// POST /recovery-tasks/{id}/cancel
pub async fn cancel_task(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = state.orchestrator.cancel_task(id, actor).await?;
    Ok(Json(DataResponse { data: task }))
}

/// DELETE /recovery-tasks/{id}
///
/// Administrative removal; refused while the drill is Running.
pub async fn delete_task(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.delete_task(id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
