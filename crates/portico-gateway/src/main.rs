//! Portico edge gateway — entry point.
//!
//! Reads configuration from environment variables, optionally seeds the
//! tenant topology and filter tables from snapshot files, and starts the
//! axum-based gateway.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORTICO_PORT` | `3000` | TCP port to listen on. |
//! | `PORTICO_DEFAULT_TENANT` | `master` | Tenant assumed without `X-Forwarded-Tenant`. |
//! | `PORTICO_DEFAULT_SCHEME` | `http` | Scheme assumed without `X-Forwarded-Proto`. |
//! | `PORTICO_PROXY_TIMEOUT_MS` | `60000` | Upstream timeout without a timeout filter. |
//! | `PORTICO_TOPOLOGY_FILE` | *(none)* | JSON file with the initial tenant list. |
//! | `PORTICO_FILTERS_FILE` | *(none)* | JSON file with the initial filter descriptors. |

use portico_gateway::config::GatewayServerConfig;
use portico_gateway::container::refresh::RefreshEvent;
use portico_gateway::server::GatewayServer;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("portico_gateway=info".parse().unwrap()),
        )
        .init();

    let mut config = GatewayServerConfig::default();
    if let Some(port) = env_parsed("PORTICO_PORT") {
        config.port = port;
    }
    if let Ok(tenant) = std::env::var("PORTICO_DEFAULT_TENANT") {
        config.default_tenant = tenant;
    }
    if let Ok(scheme) = std::env::var("PORTICO_DEFAULT_SCHEME") {
        config.default_scheme = scheme;
    }
    if let Some(millis) = env_parsed("PORTICO_PROXY_TIMEOUT_MS") {
        config.proxy_timeout = Duration::from_millis(millis);
    }

    info!(
        port = config.port,
        default_tenant = %config.default_tenant,
        "portico gateway configuration loaded"
    );

    let runtime = GatewayServer::new(config).build();

    if let Ok(path) = std::env::var("PORTICO_TOPOLOGY_FILE") {
        match load_snapshot(&path) {
            Ok(tenants) => runtime.apply(RefreshEvent::Tenants(tenants)).await,
            Err(e) => warn!(path = %path, error = %e, "failed to load topology snapshot"),
        }
    } else {
        warn!("PORTICO_TOPOLOGY_FILE is not set — no tenants are configured until a refresh arrives");
    }

    if let Ok(path) = std::env::var("PORTICO_FILTERS_FILE") {
        match load_snapshot(&path) {
            Ok(filters) => runtime.apply(RefreshEvent::Filters(filters)).await,
            Err(e) => warn!(path = %path, error = %e, "failed to load filter snapshot"),
        }
    }

    if let Err(e) = runtime.serve().await {
        error!(error = %e, "gateway exited");
        std::process::exit(1);
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn load_snapshot<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| e.to_string())
}
