//! Request dispatcher — the composition root for a single request.
//!
//! Per inbound request the dispatcher: rebuilds the externally observed
//! URI from trusted forwarding headers, resolves the caller address,
//! extracts the tenant code, gates the method, validates and strips the
//! tenant mount path, re-synthesizes the canonical forwarding header set,
//! looks up the tenant, resolves the route, and runs the filter pipeline.
//! It is also the single point translating a [`GatewayError`] into a
//! response.

pub mod forwarded;
mod remote_addr;
mod token;

pub use token::{forward_token, verify_token};

use crate::error;
use crate::route::{self, RouteDecision};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use portico_kernel::gateway::{
    GatewayError, GatewayRequest, GatewayResponse, GatewayResult, Headers, HttpMethod,
    RequestContext, ResponseBody,
};
use std::net::SocketAddr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Axum fallback handler: every path not claimed by an operational route
/// flows through here.
pub async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let structured = error::wants_structured(
        req.headers()
            .get("accept")
            .and_then(|value| value.to_str().ok()),
    );
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, state.config.max_request_bytes).await {
        Ok(body) => body,
        Err(e) => {
            let err = GatewayError::client(format!("unreadable request body: {e}"));
            return error::render(&err, structured, &request_id);
        }
    };

    let mut headers = Headers::new();
    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }

    match handle(
        &state,
        &request_id,
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query(),
        headers,
        body,
        peer,
    )
    .await
    {
        Ok(response) => into_http(response),
        Err(err) => {
            if err.status() >= 500 {
                warn!(request_id = %request_id, error = %err, "request failed");
            } else {
                info!(request_id = %request_id, status = err.status(), error = %err, "request rejected");
            }
            error::render(&err, structured, &request_id)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle(
    state: &AppState,
    request_id: &str,
    method: &str,
    raw_path: &str,
    raw_query: Option<&str>,
    mut headers: Headers,
    body: Bytes,
    peer: Option<SocketAddr>,
) -> GatewayResult<GatewayResponse> {
    // Reject unsupported methods before any routing.
    let method = HttpMethod::from_str_ci(method)
        .filter(|m| state.config.supported_methods.contains(m))
        .ok_or_else(|| GatewayError::MethodNotAllowed(method.to_string()))?;

    let origin = forwarded::rebuild_origin(&headers, raw_path, raw_query, &state.config.default_scheme);
    let remote = remote_addr::resolve(&headers, peer);

    info!(request_id = %request_id, method = %method, uri = %origin, "inbound request");

    let tenant_code = headers
        .first(forwarded::TENANT)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or(&state.config.default_tenant)
        .to_string();

    // Validate and strip the tenant mount path, then re-stamp the
    // tenant/path headers for downstream hops.
    let mount = headers
        .first(forwarded::PATH)
        .map(String::from)
        .filter(|p| !p.trim().is_empty());
    let path = match mount {
        Some(mount) => {
            let stripped = strip_mount_path(raw_path, &mount)?;
            headers.set(forwarded::TENANT, tenant_code.clone());
            headers.set(forwarded::PATH, mount.clone());
            debug!(
                request_id = %request_id,
                tenant = %tenant_code,
                mount = %mount,
                path = %stripped,
                "tenant mount path stripped"
            );
            stripped
        }
        None => {
            headers.set(forwarded::TENANT, tenant_code.clone());
            headers.remove(forwarded::PATH);
            raw_path.to_string()
        }
    };

    forwarded::synthesize(
        &mut headers,
        &origin,
        remote.map(|ip| ip.to_string()).as_deref(),
    );

    let tenant = state
        .directory
        .lookup(&tenant_code)
        .ok_or_else(|| GatewayError::client(format!("Invalid tenant '{tenant_code}'")))?;
    if !tenant.enabled {
        return Err(GatewayError::client(format!(
            "Disabled tenant '{tenant_code}'"
        )));
    }
    debug!(request_id = %request_id, tenant = %tenant.code, "tenant resolved");

    let target = match route::resolve(&tenant, &path, &origin.path)? {
        RouteDecision::Redirect(location) => {
            info!(request_id = %request_id, location = %location, "redirecting");
            return Ok(GatewayResponse::redirect(location));
        }
        RouteDecision::Proxy(target) => target,
    };

    let mut request = GatewayRequest::new(request_id, method, path);
    request.query = raw_query.map(parse_query).unwrap_or_default();
    request.headers = headers;
    request.body = body;

    let mut ctx = RequestContext::new(request, origin);
    ctx.remote_addr = remote;
    ctx.tenant = Some(tenant);
    ctx.target = Some(target);

    let dynamics = state.filters.list(&tenant_code);
    state.pipeline.run(&dynamics, &mut ctx).await?;

    ctx.response
        .take()
        .ok_or_else(|| GatewayError::internal("pipeline completed without a response"))
}

/// Validate the tenant mount path and strip it from the request path.
///
/// Violations are client errors raised before route resolution runs.
fn strip_mount_path(path: &str, mount: &str) -> GatewayResult<String> {
    if !mount.starts_with('/') {
        return Err(GatewayError::client(
            "Bad tenant path: must start with '/'",
        ));
    }
    if mount.ends_with('/') {
        return Err(GatewayError::client(
            "Bad tenant path: must not end with '/'",
        ));
    }
    if path != mount && !path.starts_with(&format!("{mount}/")) {
        return Err(GatewayError::client(
            "Bad tenant path: request path does not start with tenant path",
        ));
    }
    let stripped = &path[mount.len()..];
    Ok(if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    })
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query).unwrap_or_default()
}

/// Convert the pipeline's response into an axum response.
fn into_http(response: GatewayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in response.headers.iter() {
        builder = builder.header(name, value);
    }
    let body = match response.body {
        ResponseBody::Empty => Body::empty(),
        ResponseBody::Buffered(bytes) => Body::from(bytes),
        ResponseBody::Streaming(stream) => Body::from_stream(stream),
    };
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_path_must_start_with_a_slash() {
        let err = strip_mount_path("/t1/portal", "t1").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("start with '/'"));
    }

    #[test]
    fn mount_path_must_not_end_with_a_slash() {
        let err = strip_mount_path("/t1/portal", "/t1/").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("not end with '/'"));
    }

    #[test]
    fn mount_path_must_prefix_the_request_path() {
        let err = strip_mount_path("/other/portal", "/t1").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("does not start with"));

        // A shared string prefix without a segment boundary does not count.
        assert!(strip_mount_path("/t1x/portal", "/t1").is_err());
    }

    #[test]
    fn stripping_rewrites_the_path() {
        assert_eq!(strip_mount_path("/t1/portal/x", "/t1").unwrap(), "/portal/x");
        assert_eq!(strip_mount_path("/t1", "/t1").unwrap(), "/");
    }

    #[test]
    fn query_parsing_decodes_pairs_in_order() {
        assert_eq!(
            parse_query("a=1&b=x+y&a=2"),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x y".to_string()),
                ("a".to_string(), "2".to_string()),
            ]
        );
    }
}
