//! Route definitions for the `/recovery-tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/recovery-tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /                -> create_task
/// GET    /statistics      -> task_statistics
/// GET    /{id}            -> get_task
/// DELETE /{id}            -> delete_task
/// POST   /{id}/execute    -> execute_task
/// POST   /{id}/cancel     -> cancel_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/statistics", get(tasks::task_statistics))
        .route("/{id}", get(tasks::get_task).delete(tasks::delete_task))
        .route("/{id}/execute", post(tasks::execute_task))
        .route("/{id}/cancel", post(tasks::cancel_task))
}
