use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bcp_api::config::ServerConfig;
use bcp_api::router::build_app_router;
use bcp_api::state::AppState;
use bcp_cloud::http::HttpRdsProvider;
use bcp_engine::{
    DueTaskSweep, PgAuditSink, PgTaskStore, RecoveryOrchestrator, StuckTaskReaper, SystemClock,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bcp_api=debug,bcp_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = bcp_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    bcp_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    bcp_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Recovery engine ---
    let provider = Arc::new(HttpRdsProvider::new(
        config.provider_api_url.clone(),
        config.provider_api_token.clone(),
    ));
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        Arc::new(PgTaskStore::new(pool.clone())),
        provider,
        Arc::new(PgAuditSink::new(pool.clone())),
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    // --- Background sweeps ---
    let sweep_cancel = tokio_util::sync::CancellationToken::new();

    let due_sweep = DueTaskSweep::new(Arc::clone(&orchestrator));
    let due_interval = config.engine.due_sweep_interval;
    let due_cancel = sweep_cancel.clone();
    let due_handle = tokio::spawn(async move {
        due_sweep.run(due_cancel, due_interval).await;
    });

    let reaper = StuckTaskReaper::new(Arc::clone(&orchestrator));
    let reaper_interval = config.engine.stuck_sweep_interval;
    let reaper_cancel = sweep_cancel.clone();
    let reaper_handle = tokio::spawn(async move {
        reaper.run(reaper_cancel, reaper_interval).await;
    });

    tracing::info!("Recovery engine started (orchestrator, due sweep, stuck reaper)");

    // --- App state and router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        orchestrator,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), due_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Background sweeps stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager
/// (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
