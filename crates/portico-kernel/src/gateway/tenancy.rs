//! Tenant / application / module topology.
//!
//! The topology is delivered as a read-only, eventually-consistent snapshot
//! by an external directory service; the gateway only ever reads it.  A
//! [`Tenant`] owns an ordered list of application bindings; binding order is
//! significant — it breaks specificity ties during route resolution.

use super::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An isolated namespace.  All routing and plugin lookups are scoped by
/// tenant code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub enabled: bool,
    /// Ordered application bindings; declaration order is the tie-break for
    /// equal route-match scores.
    #[serde(default)]
    pub applications: Vec<ApplicationBinding>,
}

/// A tenant's binding to an application, with per-tenant flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationBinding {
    pub enabled: bool,
    /// At most one binding per tenant should be primary; it receives the
    /// fallback redirect for requests to `/`.
    #[serde(default)]
    pub primary: bool,
    pub application: Application,
}

/// A backend application mounted under a context path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// URL path prefix the application is mounted under, e.g. `/portal`.
    pub context_path: String,
    /// Target base URL requests are forwarded to, e.g. `http://10.0.0.5:8080`.
    pub url: String,
    /// Secret used to sign the per-hop forwarding token.  Empty disables
    /// token stamping for this application.
    #[serde(default)]
    pub key: String,
    pub enabled: bool,
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// A sub-module of an application.  Its context path is a sub-path of the
/// owning application's and may point at a different target URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub context_path: String,
    pub url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Target base
// ─────────────────────────────────────────────────────────────────────────────

/// Scheme + authority parsed from an application or module target URL.
///
/// Only the scheme and authority are taken from the configured URL; path and
/// query always come from the (possibly rewritten) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBase {
    pub scheme: String,
    pub authority: String,
}

impl TargetBase {
    /// Parse `scheme://authority[/ignored]` from a configured target URL.
    pub fn parse(url: &str) -> GatewayResult<Self> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            GatewayError::internal(format!("target url '{url}' has no scheme"))
        })?;
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if scheme.is_empty() || authority.is_empty() {
            return Err(GatewayError::internal(format!(
                "target url '{url}' has no authority"
            )));
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: authority.to_string(),
        })
    }

    /// Whether the proxy stage can forward to this target.  Anything else
    /// (e.g. a `file` scheme meaning "serve locally") is delegated outside
    /// the proxy core.
    pub fn is_proxyable(&self) -> bool {
        matches!(self.scheme.as_str(), "http" | "https")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant table
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot of the full tenant topology, looked up by tenant code.
#[derive(Debug, Default)]
pub struct TenantTable {
    tenants: HashMap<String, Arc<Tenant>>,
}

impl TenantTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        Self {
            tenants: tenants
                .into_iter()
                .map(|t| (t.code.clone(), Arc::new(t)))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<Arc<Tenant>> {
        self.tenants.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
