//! Error-to-response translation.
//!
//! The dispatcher is the single point where a [`GatewayError`] becomes an
//! HTTP response: a `{"message": "<text>"}` body for callers accepting a
//! structured format, a minimal HTML page for everyone else.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use portico_kernel::gateway::GatewayError;
use serde_json::json;

/// Whether the caller's `Accept` header admits a structured error body.
/// Absent header means a non-browser caller, which gets JSON.
pub fn wants_structured(accept: Option<&str>) -> bool {
    match accept {
        None => true,
        Some(accept) => {
            accept.contains("json") || accept.contains("*/*") || accept.contains("application/*")
        }
    }
}

/// Render `err` as the response the caller receives.
pub fn render(err: &GatewayError, structured: bool, request_id: &str) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if structured {
        (status, Json(json!({ "message": err.to_string() }))).into_response()
    } else {
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{status}</title></head>\n\
             <body>\n<h1>{status}</h1>\n<p>{}</p>\n<p><small>request {}</small></p>\n</body>\n</html>\n",
            escape_html(&err.to_string()),
            escape_html(request_id),
        );
        (status, Html(page)).into_response()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
