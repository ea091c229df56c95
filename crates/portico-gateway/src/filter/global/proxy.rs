//! HTTP proxy stage — the innermost global filter.
//!
//! Forwards the (possibly rewritten) request to the resolved target and
//! stores the upstream response in the context as a live byte stream.  Only
//! applies to `http`/`https` targets; anything else (e.g. a `file` target
//! meaning "serve locally") is left for collaborators outside this core.

use crate::dispatch::{forward_token, forwarded};
use async_trait::async_trait;
use futures::TryStreamExt;
use portico_kernel::gateway::{
    DisposeGuard, GatewayError, GatewayFilter, GatewayResult, Headers, HttpMethod, Next,
    RequestContext, UpstreamBody, UpstreamResponse,
};
use std::time::Duration;
use tracing::debug;

/// Hop-by-hop headers that must not be forwarded in either direction.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Reverse proxy over a shared, pooled `reqwest` client.
pub struct HttpProxyFilter {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpProxyFilter {
    pub fn new(default_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build proxy http client");
        Self {
            client,
            default_timeout,
        }
    }

    fn method(&self, method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            _ => reqwest::Method::from_bytes(method.as_str().as_bytes())
                .unwrap_or(reqwest::Method::GET),
        }
    }

    fn target_url(&self, ctx: &RequestContext) -> GatewayResult<String> {
        let target = ctx.require_target()?;
        let mut url = format!(
            "{}://{}{}",
            target.base.scheme, target.base.authority, ctx.request.path
        );
        if !ctx.request.query.is_empty() {
            let query = serde_urlencoded::to_string(&ctx.request.query)
                .map_err(|e| GatewayError::internal(format!("unencodable query: {e}")))?;
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }
}

#[async_trait]
impl GatewayFilter for HttpProxyFilter {
    fn name(&self) -> &str {
        "http-proxy"
    }

    fn applies(&self, ctx: &RequestContext) -> bool {
        ctx.target
            .as_ref()
            .map(|t| t.base.is_proxyable())
            .unwrap_or(false)
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        let url = self.target_url(ctx)?;
        let timeout = ctx.timeout.unwrap_or(self.default_timeout);
        let request_id = ctx.request.id.clone();
        debug!(request_id = %request_id, url = %url, "forwarding to upstream");

        let mut builder = self
            .client
            .request(self.method(ctx.request.method), &url)
            .timeout(timeout);

        for (name, value) in ctx.request.headers.iter() {
            if is_hop_by_hop(name) || name == "host" || name == "content-length" {
                continue;
            }
            builder = builder.header(name, value);
        }

        // Registered applications verify this token to ensure the hop came
        // through the gateway.
        let application = &ctx.require_target()?.application;
        if !application.key.is_empty() {
            let tenant = ctx.tenant.as_ref().map(|t| t.code.as_str()).unwrap_or("");
            builder = builder.header(
                forwarded::TOKEN,
                forward_token(&application.key, tenant, &ctx.request.id),
            );
        }

        if !ctx.request.body.is_empty() {
            builder = builder.body(ctx.request.body.clone());
        }

        let upstream = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(timeout)
            } else {
                GatewayError::Upstream(format!("{url}: {e}"))
            }
        })?;

        let status = upstream.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name.as_str()) || name.as_str() == "content-length" {
                continue;
            }
            if let Ok(v) = value.to_str() {
                headers.append(name.as_str(), v);
            }
        }

        let stream = upstream
            .bytes_stream()
            .map_err(|e| Box::new(e) as portico_kernel::gateway::types::BoxError);
        let guard = DisposeGuard::new(move || {
            debug!(request_id = %request_id, "upstream response body released");
        });

        ctx.upstream = Some(UpstreamResponse {
            status,
            headers,
            body: UpstreamBody::streaming(Box::pin(stream), guard),
        });

        next.run(ctx).await
    }
}
