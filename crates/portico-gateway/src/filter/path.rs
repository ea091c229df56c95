//! Path-manipulation filters: regex rewrite, prefix, strip-prefix.
//!
//! These edit `ctx.request.path` in place; later stages (including the
//! proxy) see the rewritten path, while `ctx.origin` keeps the path as the
//! caller sent it.

use crate::container::{bind_params, BuildError};
use async_trait::async_trait;
use portico_kernel::gateway::{GatewayFilter, GatewayResult, Next, PluginParams, RequestContext};
use regex::Regex;
use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Rewrite
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RewriteConfig {
    regexp: String,
    replacement: String,
}

/// Rewrites the request path with a regular expression, e.g.
/// `regexp = "^/test(/.*)"`, `replacement = "/oa$1"`.
pub struct RewritePathFilter {
    regexp: Regex,
    replacement: String,
}

impl RewritePathFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: RewriteConfig = bind_params(params)?;
        let regexp = Regex::new(&config.regexp)
            .map_err(|e| BuildError::invalid(format!("bad regexp: {e}")))?;
        Ok(Self {
            regexp,
            replacement: config.replacement,
        })
    }
}

#[async_trait]
impl GatewayFilter for RewritePathFilter {
    fn name(&self) -> &str {
        "rewrite-path"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        let rewritten = self
            .regexp
            .replace_all(&ctx.request.path, self.replacement.as_str())
            .into_owned();
        ctx.request.path = rewritten;
        next.run(ctx).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prefix
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PrefixConfig {
    prefix: String,
}

/// Prepends a fixed prefix to the request path.
pub struct PrefixPathFilter {
    prefix: String,
}

impl PrefixPathFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: PrefixConfig = bind_params(params)?;
        if !config.prefix.starts_with('/') {
            return Err(BuildError::invalid("'prefix' must start with '/'"));
        }
        if config.prefix.ends_with('/') {
            return Err(BuildError::invalid("'prefix' must not end with '/'"));
        }
        Ok(Self {
            prefix: config.prefix,
        })
    }
}

#[async_trait]
impl GatewayFilter for PrefixPathFilter {
    fn name(&self) -> &str {
        "prefix-path"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.path = format!("{}{}", self.prefix, ctx.request.path);
        next.run(ctx).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strip prefix
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StripConfig {
    parts: usize,
}

/// Removes the first `parts` path segments, so `/portal/api/users` with
/// `parts = 1` forwards as `/api/users`.
pub struct StripPrefixFilter {
    parts: usize,
}

impl StripPrefixFilter {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: StripConfig = bind_params(params)?;
        if config.parts == 0 {
            return Err(BuildError::invalid("'parts' must be at least 1"));
        }
        Ok(Self {
            parts: config.parts,
        })
    }

    fn strip(&self, path: &str) -> String {
        let remainder: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .skip(self.parts)
            .collect();
        if remainder.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", remainder.join("/"))
        }
    }
}

#[async_trait]
impl GatewayFilter for StripPrefixFilter {
    fn name(&self) -> &str {
        "strip-prefix"
    }

    async fn run(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<()> {
        ctx.request.path = self.strip(&ctx.request.path);
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

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new(
            GatewayRequest::new("r1", HttpMethod::Get, path),
            OriginUri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: 80,
                path: path.into(),
                query: None,
            },
        )
    }

    async fn run(filter: impl GatewayFilter + 'static, ctx: &mut RequestContext) {
        let stages: Vec<Arc<dyn GatewayFilter>> = vec![Arc::new(filter)];
        Next::new(&stages).run(ctx).await.unwrap();
    }

    #[tokio::test]
    async fn rewrite_applies_capture_groups() {
        let filter = RewritePathFilter::from_params(&params(serde_json::json!({
            "regexp": "^/test(/.*)",
            "replacement": "/oa$1"
        })))
        .unwrap();

        let mut c = ctx("/test/api/accounts");
        run(filter, &mut c).await;
        assert_eq!(c.request.path, "/oa/api/accounts");
    }

    #[tokio::test]
    async fn rewrite_leaves_origin_path_untouched() {
        let filter = RewritePathFilter::from_params(&params(serde_json::json!({
            "regexp": "^/test",
            "replacement": "/oa"
        })))
        .unwrap();

        let mut c = ctx("/test/x");
        run(filter, &mut c).await;
        assert_eq!(c.origin.path, "/test/x");
    }

    #[test]
    fn rewrite_rejects_a_bad_regexp() {
        assert!(RewritePathFilter::from_params(&params(serde_json::json!({
            "regexp": "(",
            "replacement": "/x"
        })))
        .is_err());
    }

    #[tokio::test]
    async fn prefix_prepends() {
        let filter =
            PrefixPathFilter::from_params(&params(serde_json::json!({ "prefix": "/api" })))
                .unwrap();
        let mut c = ctx("/users");
        run(filter, &mut c).await;
        assert_eq!(c.request.path, "/api/users");
    }

    #[test]
    fn prefix_shape_is_validated() {
        assert!(
            PrefixPathFilter::from_params(&params(serde_json::json!({ "prefix": "api" }))).is_err()
        );
        assert!(
            PrefixPathFilter::from_params(&params(serde_json::json!({ "prefix": "/api/" })))
                .is_err()
        );
    }

    #[tokio::test]
    async fn strip_removes_leading_segments() {
        let filter =
            StripPrefixFilter::from_params(&params(serde_json::json!({ "parts": 1 }))).unwrap();
        let mut c = ctx("/portal/api/users");
        run(filter, &mut c).await;
        assert_eq!(c.request.path, "/api/users");
    }

    #[tokio::test]
    async fn stripping_everything_leaves_the_root() {
        let filter =
            StripPrefixFilter::from_params(&params(serde_json::json!({ "parts": 5 }))).unwrap();
        let mut c = ctx("/portal/api");
        run(filter, &mut c).await;
        assert_eq!(c.request.path, "/");
    }

    #[test]
    fn zero_parts_is_rejected() {
        assert!(StripPrefixFilter::from_params(&params(serde_json::json!({ "parts": 0 }))).is_err());
    }
}
