//! Gateway error taxonomy.
//!
//! Every component raises a [`GatewayError`]; the dispatcher in
//! `portico-gateway` is the single point that translates one into an HTTP
//! response and logs it with request correlation.  The variants map onto the
//! response classes below via [`GatewayError::status`].

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the gateway core.
///
/// The enum is `#[non_exhaustive]` so future releases can add failure modes
/// without breaking existing `match` arms.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Caller faults (4xx) ──────────────────────────────────────────────
    /// Malformed request metadata: bad tenant mount path, unknown or
    /// disabled tenant, unparsable forwarding headers.
    #[error("{0}")]
    Client(String),

    /// The request method is outside the configured allow-list.
    #[error("request method '{0}' is not supported")]
    MethodNotAllowed(String),

    /// No enabled application (or fallback) matched the request path.
    #[error("no application matched '{0}'")]
    NotFound(String),

    /// A refuse filter rejected the request with a configured status.
    #[error("{message}")]
    Refused { status: u16, message: String },

    // ── Configuration faults (5xx, plugin-scoped) ────────────────────────
    /// A plugin could not be constructed from its descriptor.  Fatal for
    /// that plugin only: the previous live instance (if any) stays in
    /// service and the container keeps running.
    #[error("invalid configuration for plugin [tenant={tenant}, code={code}, kind={kind}]: {message}")]
    Configuration {
        tenant: String,
        code: String,
        kind: String,
        message: String,
    },

    // ── Upstream faults (5xx) ────────────────────────────────────────────
    /// The proxied backend was unreachable or failed mid-transfer.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The proxied backend did not answer within the effective timeout.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// Anything that indicates a bug in the gateway itself.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a [`GatewayError::Client`] fault.
    pub fn client(message: impl Into<String>) -> Self {
        GatewayError::Client(message.into())
    }

    /// Shorthand for a [`GatewayError::NotFound`] fault.
    pub fn not_found(path: impl Into<String>) -> Self {
        GatewayError::NotFound(path.into())
    }

    /// Shorthand for a [`GatewayError::Internal`] fault.
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }

    /// HTTP status code this error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Client(_) => 400,
            GatewayError::MethodNotAllowed(_) => 405,
            GatewayError::NotFound(_) => 404,
            GatewayError::Refused { status, .. } => *status,
            GatewayError::Configuration { .. } => 500,
            GatewayError::Upstream(_) => 502,
            GatewayError::Timeout(_) => 504,
            GatewayError::Internal(_) => 500,
        }
    }
}

/// Convenience alias used across both crates.
pub type GatewayResult<T> = Result<T, GatewayError>;
