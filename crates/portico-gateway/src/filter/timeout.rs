//! Per-request upstream timeout override.

use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{GatewayFilter, GatewayResult, Next, PluginParams, RequestContext};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct TimeoutConfig {
    millis: u64,
}

/// Overrides the proxy stage's upstream timeout for matching requests.
pub struct TimeoutFilter {
    timeout: Duration,
}

impl TimeoutFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: TimeoutConfig = bind_params(params)?;
        if config.millis == 0 {
            return Err(BuildError::invalid("'millis' must be greater than 0"));
        }
        Ok(Self {
            timeout: Duration::from_millis(config.millis),
        })
    }
}

#[async_trait]
impl GatewayFilter for TimeoutFilter {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.timeout = Some(self.timeout);
        next.run(ctx).await
    }
}
