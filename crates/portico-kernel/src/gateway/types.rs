//! Core data types for the gateway contract.
//!
//! These types are shared across the gateway traits
//! ([`GatewayFilter`](super::filter::GatewayFilter),
//! [`Predicate`](super::predicate::Predicate)) and the runtime crate.  They
//! carry no HTTP-framework dependencies: the runtime converts to and from
//! axum/reqwest types at its own boundary.

use super::error::{GatewayError, GatewayResult};
use super::tenancy::{Application, Module, TargetBase, Tenant};
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the verbs the gateway is willing to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Headers
// ─────────────────────────────────────────────────────────────────────────────

/// Order-preserving, multi-valued header map with lowercased names.
///
/// A `Vec` of pairs keeps declaration order (which matters when the map is
/// replayed to the upstream hop) and makes multi-value headers such as
/// `Cookie` or `Set-Cookie` trivial to represent.  Lookups are linear, which
/// is fine at the header-count scale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
    }

    /// Replace all values for `name` with a single value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.remove(name.as_ref());
        self.append(name, value);
    }

    /// Remove all values for `name`.  Returns `true` if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.len() != before
    }

    /// First value for `name`, if present.
    pub fn first(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in declaration order.
    pub fn all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    /// Iterate `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Origin URI
// ─────────────────────────────────────────────────────────────────────────────

/// The externally observed request URI, rebuilt from trusted forwarding
/// headers before anything else runs.
///
/// Filters may rewrite the *request path* during the pipeline; the origin
/// URI always keeps the path as the caller sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginUri {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
}

impl OriginUri {
    /// Whether `port` is the default for `scheme` (and can be omitted when
    /// rendering).
    fn is_default_port(&self) -> bool {
        matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443)
        )
    }
}

impl fmt::Display for OriginUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.is_default_port() {
            write!(f, ":{}", self.port)?;
        }
        f.write_str(&self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{q}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the gateway.
///
/// All fields use owned types so the struct can cross async task boundaries
/// without lifetime complications.  `path` and `query` are mutable on
/// purpose: path-rewriting and parameter filters edit them in place before
/// the proxy stage reads them.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Unique identifier correlating this request across logs.
    pub id: String,
    pub method: HttpMethod,
    /// Request path as currently seen by the pipeline (mount-path stripped,
    /// possibly rewritten by filters).
    pub path: String,
    /// Decoded query parameters, in declaration order.
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    /// Buffered request body.
    pub body: Bytes,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, method, and path.
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Builder helper: attach a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// All cookies across every `Cookie` header, as `(name, value)` pairs in
    /// declaration order.
    pub fn cookies(&self) -> Vec<(&str, &str)> {
        self.headers
            .all("cookie")
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                Some((name.trim(), value.trim()))
            })
            .collect()
    }

    /// All values of the cookie named `name`.
    pub fn cookie_values(&self, name: &str) -> Vec<&str> {
        self.cookies()
            .into_iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route target
// ─────────────────────────────────────────────────────────────────────────────

/// The outcome of route resolution: where the request will be forwarded.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub application: Arc<Application>,
    /// Set when a module refined the match to a more specific sub-target.
    pub module: Option<Arc<Module>>,
    /// Context path of whichever of the two was selected.
    pub context_path: String,
    /// Scheme + authority the proxy stage will forward to.
    pub base: TargetBase,
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream response & body disposal
// ─────────────────────────────────────────────────────────────────────────────

/// Boxed error type used by body streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed byte stream carrying an upstream response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Fire-exactly-once cleanup hook for an upstream body resource.
///
/// The hook runs on the first of: explicit [`dispose`](Self::dispose) or
/// drop.  Subsequent calls are no-ops, which is what gives the
/// response-writing stage its exactly-once guarantee across normal
/// completion, mid-pipeline errors, and client cancellation.
pub struct DisposeGuard(Option<Box<dyn FnOnce() + Send>>);

impl DisposeGuard {
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(hook)))
    }

    /// Guard with no hook — used for bodies that own no external resource.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Run the hook now, if it has not run yet.
    pub fn dispose(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DisposeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisposeGuard")
            .field(&self.0.as_ref().map(|_| "pending").unwrap_or("spent"))
            .finish()
    }
}

/// The body of a proxied upstream response, plus its disposal guard.
pub struct UpstreamBody {
    stream: Option<ByteStream>,
    guard: DisposeGuard,
}

impl UpstreamBody {
    /// A live streaming body.  `guard` fires once when the body is disposed
    /// or dropped.
    pub fn streaming(stream: ByteStream, guard: DisposeGuard) -> Self {
        Self {
            stream: Some(stream),
            guard,
        }
    }

    /// An empty body with no resource behind it.
    pub fn empty() -> Self {
        Self {
            stream: None,
            guard: DisposeGuard::noop(),
        }
    }

    /// Drop the stream and fire the guard now.
    pub fn dispose(&mut self) {
        self.stream = None;
        self.guard.dispose();
    }

    /// Take ownership of the stream and guard, leaving the body empty.
    /// Returns `None` if the body was already consumed or disposed.
    pub fn take(&mut self) -> Option<(ByteStream, DisposeGuard)> {
        let stream = self.stream.take()?;
        let guard = std::mem::replace(&mut self.guard, DisposeGuard::noop());
        Some((stream, guard))
    }
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamBody")
            .field("live", &self.stream.is_some())
            .finish()
    }
}

/// A proxied response as received from the upstream application.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.first("content-type")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Final response
// ─────────────────────────────────────────────────────────────────────────────

/// Byte stream that carries its disposal guard with it, so the guard fires
/// when the stream is dropped — whether it ran to completion or the inbound
/// connection was cancelled mid-transfer.
pub struct GuardedStream {
    inner: ByteStream,
    _guard: DisposeGuard,
}

impl GuardedStream {
    pub fn new(inner: ByteStream, guard: DisposeGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl Stream for GuardedStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Response body in the form the dispatcher hands to the HTTP server.
pub enum ResponseBody {
    Empty,
    Buffered(Bytes),
    Streaming(GuardedStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// The response the pipeline produced for the caller.
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl GatewayResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Builder helper: set a buffered body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Buffered(body.into());
        self
    }

    /// A `307 Temporary Redirect` to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(307).with_header("location", location)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable context owned by a single in-flight request.
///
/// Created at dispatch start, discarded at response completion or
/// cancellation; never shared across requests.  Filters read from and write
/// to it, which is how upstream decisions (resolved tenant, route target,
/// timeout overrides) reach downstream stages.
pub struct RequestContext {
    pub request: GatewayRequest,
    /// Externally observed URI, normalized from trusted forwarding headers.
    pub origin: OriginUri,
    /// Caller address resolved via the header chain, transport peer as
    /// fallback.
    pub remote_addr: Option<IpAddr>,
    /// Resolved tenant; set by the dispatcher before the pipeline runs.
    pub tenant: Option<Arc<Tenant>>,
    /// Resolved application/module target; set by the route resolver.
    pub target: Option<RouteTarget>,
    /// Per-request upstream timeout override (timeout filter).
    pub timeout: Option<Duration>,
    /// Response received from the proxied backend, if any.
    pub upstream: Option<UpstreamResponse>,
    /// Final response to the caller, once a stage has produced one.
    pub response: Option<GatewayResponse>,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Create a fresh context from an inbound request and its origin URI.
    pub fn new(request: GatewayRequest, origin: OriginUri) -> Self {
        Self {
            request,
            origin,
            remote_addr: None,
            tenant: None,
            target: None,
            timeout: None,
            upstream: None,
            response: None,
            attributes: HashMap::new(),
        }
    }

    /// The resolved route target, or an internal error when a stage that
    /// requires routing runs before resolution happened.
    pub fn require_target(&self) -> GatewayResult<&RouteTarget> {
        self.target
            .as_ref()
            .ok_or_else(|| GatewayError::internal("no route target resolved"))
    }

    /// Dispose the upstream body resource, if one is still held.
    pub fn dispose_upstream(&mut self) {
        if let Some(upstream) = self.upstream.as_mut() {
            upstream.body.dispose();
        }
    }

    /// Convenience: read a typed attribute, `None` if absent or of the wrong
    /// shape.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience: write a serializable attribute.
    pub fn set_attr<T: Serialize>(&mut self, key: impl Into<String>, value: &T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.attributes.insert(key.into(), v);
        }
    }
}
