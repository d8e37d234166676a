use std::time::Duration;

use bcp_engine::EngineConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL of the cloud provider's management API.
    pub provider_api_url: String,
    /// Bearer token for the provider API.
    pub provider_api_token: String,
    /// Recovery engine timing knobs.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                   |
    /// |--------------------------|---------------------------|
    /// | `HOST`                   | `0.0.0.0`                 |
    /// | `PORT`                   | `3000`                    |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                      |
    /// | `PROVIDER_API_URL`       | `http://localhost:9400`   |
    /// | `PROVIDER_API_TOKEN`     | (empty)                   |
    /// | `READY_POLL_SECS`        | `30`                      |
    /// | `READY_WAIT_CEILING_SECS`| `1800`                    |
    /// | `STUCK_CEILING_SECS`     | `7200`                    |
    /// | `DUE_SWEEP_SECS`         | `3600`                    |
    /// | `STUCK_SWEEP_SECS`       | `600`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs = env_u64("SHUTDOWN_TIMEOUT_SECS", 30);

        let provider_api_url =
            std::env::var("PROVIDER_API_URL").unwrap_or_else(|_| "http://localhost:9400".into());
        let provider_api_token = std::env::var("PROVIDER_API_TOKEN").unwrap_or_default();

        let engine = EngineConfig {
            ready_poll_interval: Duration::from_secs(env_u64("READY_POLL_SECS", 30)),
            ready_wait_ceiling: Duration::from_secs(env_u64("READY_WAIT_CEILING_SECS", 1800)),
            stuck_ceiling: Duration::from_secs(env_u64("STUCK_CEILING_SECS", 7200)),
            due_sweep_interval: Duration::from_secs(env_u64("DUE_SWEEP_SECS", 3600)),
            stuck_sweep_interval: Duration::from_secs(env_u64("STUCK_SWEEP_SECS", 600)),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            provider_api_url,
            provider_api_token,
            engine,
        }
    }
}

/// Read a u64 env var with a default, panicking on malformed values so
/// misconfiguration fails fast at startup.
fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
