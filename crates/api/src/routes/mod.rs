pub mod audit;
pub mod health;
pub mod instances;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /recovery-tasks                  list, create
/// /recovery-tasks/statistics       status tally
/// /recovery-tasks/{id}             get, delete
/// /recovery-tasks/{id}/execute     start the drill pipeline
/// /recovery-tasks/{id}/cancel      cancel a pending/running drill
///
/// /instances                       list (read-only registry)
/// /instances/{id}                  get
///
/// /audit-logs                      query the audit trail
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/recovery-tasks", tasks::router())
        .nest("/instances", instances::router())
        .nest("/audit-logs", audit::router())
}
