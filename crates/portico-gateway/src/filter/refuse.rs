//! Refuse filter: rejects matching requests with a configured status.
//!
//! The judgment of *which* requests to reject comes entirely from the
//! owning descriptor's predicates; this filter only supplies the verdict.

use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{
    GatewayError, GatewayFilter, GatewayResult, Next, PluginParams, RequestContext,
};
use serde::Deserialize;

fn default_status() -> u16 {
    403
}

fn default_message() -> String {
    "Forbidden".to_string()
}

#[derive(Deserialize)]
struct RefuseConfig {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default = "default_message")]
    message: String,
}

/// Short-circuits the chain with a client-facing error.
pub struct RequestRefuseFilter {
    status: u16,
    message: String,
}

impl RequestRefuseFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: RefuseConfig = bind_params(params)?;
        if !(400..=599).contains(&config.status) {
            return Err(BuildError::invalid(format!(
                "status {} is not an error status",
                config.status
            )));
        }
        if config.message.is_empty() {
            return Err(BuildError::invalid("'message' must not be empty"));
        }
        Ok(Self {
            status: config.status,
            message: config.message,
        })
    }
}

#[async_trait]
impl GatewayFilter for RequestRefuseFilter {
    fn name(&self) -> &str {
        "request-refuse"
    }

    async fn run(&self, _ctx: &mut RequestContext, _next: Next<'_>) -> GatewayResult<()> {
        Err(GatewayError::Refused {
            status: self.status,
            message: self.message.clone(),
        })
    }
}
