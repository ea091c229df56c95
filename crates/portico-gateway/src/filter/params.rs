//! Query-parameter filters.

use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{GatewayFilter, GatewayResult, Next, PluginParams, RequestContext};
use serde::Deserialize;

#[derive(Deserialize)]
struct ParameterPairConfig {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct ParameterNameConfig {
    name: String,
}

fn checked_name(name: String) -> Result<String, BuildError> {
    if name.trim().is_empty() {
        return Err(BuildError::invalid("'name' must not be blank"));
    }
    Ok(name)
}

/// Appends a query parameter to the forwarded request.
pub struct AddRequestParameterFilter {
    name: String,
    value: String,
}

impl AddRequestParameterFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: ParameterPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for AddRequestParameterFilter {
    fn name(&self) -> &str {
        "add-request-parameter"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request
            .query
            .push((self.name.clone(), self.value.clone()));
        next.run(ctx).await
    }
}

/// Sets a query parameter, replacing any existing values.
pub struct SetRequestParameterFilter {
    name: String,
    value: String,
}

impl SetRequestParameterFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: ParameterPairConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
            value: config.value,
        })
    }
}

#[async_trait]
impl GatewayFilter for SetRequestParameterFilter {
    fn name(&self) -> &str {
        "set-request-parameter"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.query.retain(|(n, _)| *n != self.name);
        ctx.request
            .query
            .push((self.name.clone(), self.value.clone()));
        next.run(ctx).await
    }
}

/// Removes a query parameter from the forwarded request.
pub struct RemoveRequestParameterFilter {
    name: String,
}

impl RemoveRequestParameterFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: ParameterNameConfig = bind_params(params)?;
        Ok(Self {
            name: checked_name(config.name)?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RemoveRequestParameterFilter {
    fn name(&self) -> &str {
        "remove-request-parameter"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.query.retain(|(n, _)| *n != self.name);
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_kernel::gateway::{GatewayRequest, HttpMethod, OriginUri};
    use std::sync::Arc;

    fn params(value: serde_json::Value) -> PluginParams {
        value.as_object().unwrap().clone()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            GatewayRequest::new("r1", HttpMethod::Get, "/portal/")
                .with_query("page", "1")
                .with_query("tag", "a")
                .with_query("tag", "b"),
            OriginUri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: 80,
                path: "/portal/".into(),
                query: Some("page=1&tag=a&tag=b".into()),
            },
        )
    }

    async fn run(filter: impl GatewayFilter + 'static, ctx: &mut RequestContext) {
        let stages: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(filter)];
        Next::new(&stages).run(ctx).await.unwrap();
    }

    #[tokio::test]
    async fn add_keeps_existing_values() {
        let mut c = ctx();
        run(
            AddRequestParameterFilter::from_params(&params(
                serde_json::json!({ "name": "tag", "value": "c" }),
            ))
            .unwrap(),
            &mut c,
        )
        .await;

        let tags: Vec<_> = c
            .request
            .query
            .iter()
            .filter(|(n, _)| n == "tag")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn set_replaces_all_values() {
        let mut c = ctx();
        run(
            SetRequestParameterFilter::from_params(&params(
                serde_json::json!({ "name": "tag", "value": "only" }),
            ))
            .unwrap(),
            &mut c,
        )
        .await;

        let tags: Vec<_> = c
            .request
            .query
            .iter()
            .filter(|(n, _)| n == "tag")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(tags, vec!["only"]);
    }

    #[tokio::test]
    async fn remove_drops_the_parameter() {
        let mut c = ctx();
        run(
            RemoveRequestParameterFilter::from_params(&params(serde_json::json!({ "name": "tag" })))
                .unwrap(),
            &mut c,
        )
        .await;

        assert!(c.request.query.iter().all(|(n, _)| n != "tag"));
        assert!(c.request.query.iter().any(|(n, _)| n == "page"));
    }
}
