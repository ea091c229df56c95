//! Plugin descriptor model and lifecycle contract.
//!
//! A *descriptor* is the persisted record describing a plugin's desired
//! configuration: tenant, code, type code, a flat parameter map, and a
//! modify-timestamp.  The source of truth is external; descriptors arrive
//! via refresh notifications carrying full snapshots.  The runtime's
//! dynamic container diffs them by `(tenant, code, modified_at)` to decide
//! what to (re)construct.

use super::error::GatewayResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat parameter blob bound onto a plugin's typed configuration.
/// Values are strings, numbers, bools, or lists thereof.
pub type PluginParams = serde_json::Map<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// The generic persisted plugin record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub tenant: String,
    /// Unique per tenant.
    pub code: String,
    /// Type code resolved to an implementation by a factory registry.
    pub kind: String,
    #[serde(default)]
    pub params: PluginParams,
    pub modified_at: DateTime<Utc>,
}

/// A predicate attached to a filter descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateDescriptor {
    pub kind: String,
    #[serde(default)]
    pub params: PluginParams,
}

/// Specialized plugin record for gateway filters: adds ordering, an enabled
/// flag, the matching path, and the predicate list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub tenant: String,
    pub code: String,
    pub kind: String,
    /// Position among the tenant's dynamic filters; ties resolve by
    /// declaration sequence in the snapshot table.
    pub order: i32,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Path this filter is mounted under; installed as an implicit path
    /// predicate ahead of the configured ones.
    pub path: String,
    #[serde(default)]
    pub predicates: Vec<PredicateDescriptor>,
    #[serde(default)]
    pub params: PluginParams,
    pub modified_at: DateTime<Utc>,
}

fn enabled_default() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Contracts
// ─────────────────────────────────────────────────────────────────────────────

/// Descriptor contract consumed by the dynamic container: anything that
/// identifies a plugin by `(tenant, code)` and versions it by
/// modify-timestamp.
pub trait PluginSpec: Clone + Send + Sync + 'static {
    fn tenant(&self) -> &str;
    fn code(&self) -> &str;
    fn kind(&self) -> &str;
    fn modified_at(&self) -> DateTime<Utc>;
}

impl PluginSpec for PluginDescriptor {
    fn tenant(&self) -> &str {
        &self.tenant
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn kind(&self) -> &str {
        &self.kind
    }
    fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

impl PluginSpec for FilterDescriptor {
    fn tenant(&self) -> &str {
        &self.tenant
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn kind(&self) -> &str {
        &self.kind
    }
    fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

/// Lifecycle contract for a live plugin instance.
///
/// `destroy` runs when the instance is superseded by a hot swap, removed,
/// or the container shuts down — always *after* the replacement (if any) is
/// visible to new lookups.  Failures are reported by the container but never
/// propagate into in-flight requests.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    async fn destroy(&self) -> GatewayResult<()> {
        Ok(())
    }
}
