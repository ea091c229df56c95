//! Runtime configuration.

use portico_kernel::gateway::HttpMethod;
use std::collections::HashSet;
use std::time::Duration;

/// Gateway server configuration, environment-driven in `main`.
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Tenant code assumed when no `X-Forwarded-Tenant` header arrives.
    pub default_tenant: String,
    /// Scheme assumed when no `X-Forwarded-Proto` header arrives.
    pub default_scheme: String,
    /// Methods the gateway is willing to forward; anything else is rejected
    /// with `405` before routing.
    pub supported_methods: HashSet<HttpMethod>,
    /// Upstream timeout when no timeout filter overrides it.
    pub proxy_timeout: Duration,
    /// Cap on buffered inbound request bodies.
    pub max_request_bytes: usize,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            default_tenant: "master".to_string(),
            default_scheme: "http".to_string(),
            supported_methods: [
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete,
                HttpMethod::Head,
                HttpMethod::Options,
            ]
            .into_iter()
            .collect(),
            proxy_timeout: Duration::from_secs(60),
            max_request_bytes: 16 * 1024 * 1024,
        }
    }
}
