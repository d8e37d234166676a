use std::sync::Arc;

use bcp_engine::RecoveryOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: bcp_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The recovery drill orchestrator.
    pub orchestrator: Arc<RecoveryOrchestrator>,
}
