//! Route definitions for the read-only `/instances` registry.

use axum::routing::get;
use axum::Router;

use crate::handlers::instances;
use crate::state::AppState;

/// Routes mounted at `/instances`.
///
/// ```text
/// GET /          -> list_instances
/// GET /{id}      -> get_instance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(instances::list_instances))
        .route("/{id}", get(instances::get_instance))
}
