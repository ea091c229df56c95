//! Cross-origin filter.
//!
//! Answers preflight `OPTIONS` requests directly and stamps CORS headers on
//! ordinary responses.  Preflights never reach the proxy stage.

use super::response_headers_mut;
use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{
    GatewayFilter, GatewayResponse, GatewayResult, HttpMethod, Next, PluginParams, RequestContext,
};
use serde::Deserialize;

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

#[derive(Deserialize)]
struct CrossOriginConfig {
    #[serde(default = "default_origins")]
    allow_origins: Vec<String>,
    #[serde(default = "default_methods")]
    allow_methods: Vec<String>,
    #[serde(default = "default_headers")]
    allow_headers: Vec<String>,
    #[serde(default)]
    allow_credentials: bool,
    #[serde(default = "default_max_age")]
    max_age: u64,
}

pub struct CrossOriginFilter {
    allow_origins: Vec<String>,
    allow_methods: String,
    allow_headers: String,
    allow_credentials: bool,
    max_age: u64,
}

impl CrossOriginFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: CrossOriginConfig = bind_params(params)?;
        if config.allow_origins.is_empty() {
            return Err(BuildError::invalid("'allow_origins' must not be empty"));
        }
        if config.allow_credentials && config.allow_origins.iter().any(|o| o == "*") {
            // The Fetch spec forbids credentials with a wildcard origin.
            return Err(BuildError::invalid(
                "'allow_credentials' requires explicit origins, not '*'",
            ));
        }
        Ok(Self {
            allow_origins: config.allow_origins,
            allow_methods: config.allow_methods.join(", "),
            allow_headers: config.allow_headers.join(", "),
            allow_credentials: config.allow_credentials,
            max_age: config.max_age,
        })
    }

    /// The `Access-Control-Allow-Origin` value for this caller, if allowed.
    fn allowed_origin<'a>(&'a self, origin: &'a str) -> Option<&'a str> {
        if self.allow_origins.iter().any(|o| o == "*") {
            return Some("*");
        }
        self.allow_origins
            .iter()
            .find(|o| o.as_str() == origin)
            .map(|o| o.as_str())
    }
}

#[async_trait]
impl GatewayFilter for CrossOriginFilter {
    fn name(&self) -> &str {
        "cross-origin"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        let Some(origin) = ctx.request.headers.first("origin").map(String::from) else {
            // Same-origin traffic passes through untouched.
            return next.run(ctx).await;
        };

        let allowed = self.allowed_origin(&origin).map(String::from);

        if ctx.request.method == HttpMethod::Options {
            // Preflight: answer directly without invoking the remainder.
            let Some(allowed) = allowed else {
                ctx.response = Some(GatewayResponse::new(403));
                return Ok(());
            };
            let mut response = GatewayResponse::new(204)
                .with_header("access-control-allow-origin", allowed)
                .with_header("access-control-allow-methods", self.allow_methods.clone())
                .with_header("access-control-max-age", self.max_age.to_string());
            let requested = ctx
                .request
                .headers
                .first("access-control-request-headers")
                .map(String::from);
            response = response.with_header(
                "access-control-allow-headers",
                requested.unwrap_or_else(|| self.allow_headers.clone()),
            );
            if self.allow_credentials {
                response = response.with_header("access-control-allow-credentials", "true");
            }
            ctx.response = Some(response);
            return Ok(());
        }

        next.run(ctx).await?;

        if let Some(allowed) = allowed {
            if let Some(headers) = response_headers_mut(ctx) {
                headers.set("access-control-allow-origin", allowed);
                headers.append("vary", "origin");
                if self.allow_credentials {
                    headers.set("access-control-allow-credentials", "true");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_kernel::gateway::{
        GatewayRequest, Headers, OriginUri, ResponseBody, UpstreamBody, UpstreamResponse,
    };
    use std::sync::Arc;

    fn params(value: serde_json::Value) -> PluginParams {
        value.as_object().unwrap().clone()
    }

    fn ctx(method: HttpMethod, headers: &[(&str, &str)]) -> RequestContext {
        let mut request = GatewayRequest::new("r1", method, "/portal/api");
        for (name, value) in headers {
            request = request.with_header(*name, *value);
        }
        RequestContext::new(
            request,
            OriginUri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: 80,
                path: "/portal/api".into(),
                query: None,
            },
        )
    }

    struct FakeUpstream;

    #[async_trait]
    impl GatewayFilter for FakeUpstream {
        fn name(&self) -> &str {
            "fake-upstream"
        }

        async fn run(&self, ctx: &mut RequestContext, _next: Next<'_>) -> GatewayResult<()> {
            ctx.upstream = Some(UpstreamResponse {
                status: 200,
                headers: Headers::new(),
                body: UpstreamBody::empty(),
            });
            Ok(())
        }
    }

    async fn run(filter: &Arc<dyn GatewayFilter>, ctx: &mut RequestContext) {
        let stages: Vec<Arc<dyn GatewayFilter>> = vec![filter.clone(), Arc::new(FakeUpstream)];
        Next::new(&stages).run(ctx).await.unwrap();
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_allow_headers() {
        let filter: Arc<dyn GatewayFilter> = Arc::new(
            CrossOriginFilter::from_params(&params(serde_json::json!({
                "allow_origins": ["https://app.example.com"]
            })))
            .unwrap(),
        );

        let mut c = ctx(
            HttpMethod::Options,
            &[
                ("origin", "https://app.example.com"),
                ("access-control-request-headers", "x-custom"),
            ],
        );
        run(&filter, &mut c).await;

        let response = c.response.as_ref().expect("preflight response");
        assert_eq!(response.status, 204);
        assert_eq!(
            response.headers.first("access-control-allow-origin"),
            Some("https://app.example.com")
        );
        assert_eq!(
            response.headers.first("access-control-allow-headers"),
            Some("x-custom")
        );
        assert!(matches!(response.body, ResponseBody::Empty));
        // The chain never reached the fake upstream.
        assert!(c.upstream.is_none());
    }

    #[tokio::test]
    async fn disallowed_preflight_origin_is_refused() {
        let filter: Arc<dyn GatewayFilter> = Arc::new(
            CrossOriginFilter::from_params(&params(serde_json::json!({
                "allow_origins": ["https://app.example.com"]
            })))
            .unwrap(),
        );

        let mut c = ctx(HttpMethod::Options, &[("origin", "https://evil.example")]);
        run(&filter, &mut c).await;
        assert_eq!(c.response.as_ref().unwrap().status, 403);
    }

    #[tokio::test]
    async fn ordinary_requests_get_response_headers() {
        let filter: Arc<dyn GatewayFilter> =
            Arc::new(CrossOriginFilter::from_params(&PluginParams::new()).unwrap());

        let mut c = ctx(HttpMethod::Get, &[("origin", "https://app.example.com")]);
        run(&filter, &mut c).await;

        let upstream = c.upstream.as_ref().expect("proxied");
        assert_eq!(
            upstream.headers.first("access-control-allow-origin"),
            Some("*")
        );
    }

    #[tokio::test]
    async fn same_origin_requests_pass_through_untouched() {
        let filter: Arc<dyn GatewayFilter> =
            Arc::new(CrossOriginFilter::from_params(&PluginParams::new()).unwrap());

        let mut c = ctx(HttpMethod::Get, &[]);
        run(&filter, &mut c).await;
        assert!(!c
            .upstream
            .as_ref()
            .unwrap()
            .headers
            .contains("access-control-allow-origin"));
    }

    #[test]
    fn credentials_with_wildcard_origin_is_rejected() {
        assert!(CrossOriginFilter::from_params(&params(serde_json::json!({
            "allow_credentials": true
        })))
        .is_err());
    }
}
