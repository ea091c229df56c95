//! Request / response header filters.

use super::response_headers_mut;
use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{
    GatewayFilter, GatewayResult, Next, PluginParams, RequestContext,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct HeaderPairConfig {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct HeaderNameConfig {
    name: String,
}

fn checked_name(name: String) -> Result<String, BuildError> {
    if name.trim().is_empty() {
        return Err(BuildError::invalid("'name' must not be blank"));
    }
    Ok(name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request headers
// ─────────────────────────────────────────────────────────────────────────────

/// Appends a header to the forwarded request, keeping existing values.
pub struct AddRequestHeaderFilter {
    name: String,
    value: String,
}

impl AddRequestHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for AddRequestHeaderFilter {
    fn name(&self) -> &str {
        "add-request-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.headers.append(&self.name, self.value.clone());
        next.run(ctx).await
    }
}

/// Sets a header on the forwarded request, replacing existing values.
pub struct SetRequestHeaderFilter {
    name: String,
    value: String,
}

impl SetRequestHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for SetRequestHeaderFilter {
    fn name(&self) -> &str {
        "set-request-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.headers.set(&self.name, self.value.clone());
        next.run(ctx).await
    }
}

/// Removes a header from the forwarded request.
pub struct RemoveRequestHeaderFilter {
    name: String,
}

impl RemoveRequestHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderNameConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RemoveRequestHeaderFilter {
    fn name(&self) -> &str {
        "remove-request-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.headers.remove(&self.name);
        next.run(ctx).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response headers
// ─────────────────────────────────────────────────────────────────────────────

/// Appends a header to the response after the rest of the chain completes.
pub struct AddResponseHeaderFilter {
    name: String,
    value: String,
}

impl AddResponseHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for AddResponseHeaderFilter {
    fn name(&self) -> &str {
        "add-response-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        next.run(ctx).await?;
        if let Some(headers) = response_headers_mut(ctx) {
            headers.append(&self.name, self.value.clone());
        }
        Ok(())
    }
}

/// Sets a response header, replacing whatever the upstream sent.
pub struct SetResponseHeaderFilter {
    name: String,
    value: String,
}

impl SetResponseHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for SetResponseHeaderFilter {
    fn name(&self) -> &str {
        "set-response-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        next.run(ctx).await?;
        if let Some(headers) = response_headers_mut(ctx) {
            headers.set(&self.name, self.value.clone());
        }
        Ok(())
    }
}

/// Removes a header from the response.
pub struct RemoveResponseHeaderFilter {
    name: String,
}

impl RemoveResponseHeaderFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: HeaderNameConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RemoveResponseHeaderFilter {
    fn name(&self) -> &str {
        "remove-response-header"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        next.run(ctx).await?;
        if let Some(headers) = response_headers_mut(ctx) {
            headers.remove(&self.name);
        }
        Ok(())
    }
}
