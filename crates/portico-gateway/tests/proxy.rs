//! End-to-end proxy tests against a real local upstream.
//!
//! Each test spins an axum echo server on an ephemeral port, registers it
//! as a tenant application, and drives the gateway router directly.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use portico_gateway::config::GatewayServerConfig;
use portico_gateway::container::refresh::RefreshEvent;
use portico_gateway::dispatch::verify_token;
use portico_gateway::server::{GatewayRuntime, GatewayServer};
use portico_kernel::gateway::{
    Application, ApplicationBinding, FilterDescriptor, PluginParams, Tenant,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;

/// Upstream that echoes the request line and selected headers back in
/// response headers.
async fn echo(req: Request) -> Response {
    let headers = req.headers().clone();
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain")
        .header("x-echo-path", req.uri().path())
        .header("x-echo-query", req.uri().query().unwrap_or(""));
    for name in ["x-forwarded-tenant", "x-forwarded-token", "x-added"] {
        if let Some(value) = headers.get(name) {
            builder = builder.header(format!("x-echo-{name}"), value.clone());
        }
    }
    builder.body(Body::from("upstream-ok")).unwrap()
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new().fallback(echo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_slow_upstream(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn portal_tenant(upstream: SocketAddr, key: &str) -> Tenant {
    Tenant {
        code: "master".into(),
        name: "Master".into(),
        enabled: true,
        applications: vec![ApplicationBinding {
            enabled: true,
            primary: false,
            application: Application {
                code: "portal".into(),
                name: "Portal".into(),
                context_path: "/portal".into(),
                url: format!("http://{upstream}"),
                key: key.into(),
                enabled: true,
                modules: Vec::new(),
            },
        }],
    }
}

async fn runtime_for(upstream: SocketAddr, key: &str) -> GatewayRuntime {
    let runtime = GatewayServer::new(GatewayServerConfig::default()).build();
    runtime
        .apply(RefreshEvent::Tenants(vec![portal_tenant(upstream, key)]))
        .await;
    runtime
}

fn filter(code: &str, kind: &str, order: i32, params: serde_json::Value) -> FilterDescriptor {
    FilterDescriptor {
        tenant: "master".into(),
        code: code.into(),
        kind: kind.into(),
        order,
        enabled: true,
        path: "/portal".into(),
        predicates: Vec::new(),
        params: params.as_object().cloned().unwrap_or_else(PluginParams::new),
        modified_at: Utc.timestamp_opt(100, 0).unwrap(),
    }
}

async fn get(runtime: &GatewayRuntime, uri: &str) -> Response {
    runtime
        .router
        .clone()
        .oneshot(
            axum::http::Request::get(uri)
                .header("accept", "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn proxies_to_the_resolved_application() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "").await;

    let response = get(&runtime, "/portal/home?a=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-echo-path").unwrap(), "/portal/home");
    assert_eq!(response.headers().get("x-echo-query").unwrap(), "a=1");
    assert_eq!(
        response.headers().get("x-echo-x-forwarded-tenant").unwrap(),
        "master"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"upstream-ok");
}

#[tokio::test]
async fn request_header_filter_is_visible_upstream() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "").await;
    runtime
        .apply(RefreshEvent::Filters(vec![filter(
            "stamp",
            "add_request_header",
            10,
            serde_json::json!({ "name": "x-added", "value": "by-gateway" }),
        )]))
        .await;

    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-echo-x-added").unwrap(),
        "by-gateway"
    );
}

#[tokio::test]
async fn response_header_filter_edits_the_final_response() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "").await;
    runtime
        .apply(RefreshEvent::Filters(vec![filter(
            "served-by",
            "set_response_header",
            10,
            serde_json::json!({ "name": "x-served-by", "value": "portico" }),
        )]))
        .await;

    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.headers().get("x-served-by").unwrap(), "portico");
}

#[tokio::test]
async fn strip_prefix_filter_rewrites_the_forwarded_path() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "").await;
    runtime
        .apply(RefreshEvent::Filters(vec![filter(
            "strip",
            "strip_prefix",
            10,
            serde_json::json!({ "parts": 1 }),
        )]))
        .await;

    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.headers().get("x-echo-path").unwrap(), "/home");
}

#[tokio::test]
async fn registered_applications_receive_a_verifiable_token() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "portal-secret").await;

    let response = get(&runtime, "/portal/home").await;
    let token = response
        .headers()
        .get("x-echo-x-forwarded-token")
        .expect("token forwarded")
        .to_str()
        .unwrap();

    let claims = verify_token("portal-secret", token).expect("token verifies");
    assert_eq!(claims["tc"], "master");
    assert!(verify_token("wrong-secret", token).is_none());
}

#[tokio::test]
async fn unreachable_upstream_is_a_bad_gateway() {
    // Reserve a port, then drop the listener so nothing answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let runtime = runtime_for(addr, "").await;
    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn timeout_filter_turns_a_slow_upstream_into_504() {
    let upstream = spawn_slow_upstream(Duration::from_millis(500)).await;
    let runtime = runtime_for(upstream, "").await;
    runtime
        .apply(RefreshEvent::Filters(vec![filter(
            "tight-timeout",
            "timeout",
            10,
            serde_json::json!({ "millis": 50 }),
        )]))
        .await;

    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn predicate_gates_the_filter_per_request() {
    let upstream = spawn_upstream().await;
    let runtime = runtime_for(upstream, "").await;

    let mut refuse = filter(
        "get-block",
        "request_refuse",
        10,
        serde_json::json!({ "status": 403, "message": "no GETs" }),
    );
    refuse.predicates = vec![portico_kernel::gateway::PredicateDescriptor {
        kind: "method".into(),
        params: serde_json::json!({ "methods": ["GET"] })
            .as_object()
            .cloned()
            .unwrap(),
    }];
    runtime.apply(RefreshEvent::Filters(vec![refuse])).await;

    let response = get(&runtime, "/portal/home").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // POST does not satisfy the predicate list, so the request proxies.
    let response = runtime
        .router
        .clone()
        .oneshot(
            axum::http::Request::post("/portal/home")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
