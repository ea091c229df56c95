//! Dynamic plugin container: per-tenant hot-swap registry of live plugin
//! instances.
//!
//! The registry is a snapshot-swap structure: readers load the current
//! snapshot through an [`ArcSwap`] and never block behind the writer; the
//! single writer (the refresh consumer) builds a modified copy and swaps it
//! in atomically.  For each `(tenant, code)` key the lifecycle is:
//!
//! ```text
//! ABSENT ──descriptor──► LIVE ──new modify-timestamp──► LIVE (new instance)
//!                          │            construct → swap → destroy old
//!                          └──remove / shutdown──► DESTROYED
//! ```
//!
//! The replacement instance is constructed *before* the swap and the old
//! instance destroyed only *after* the swap, so concurrent lookups always
//! observe either the fully-old or the fully-new instance.

mod factory;
pub mod refresh;

pub use factory::{bind_params, BuildError, FactoryRegistry};

use arc_swap::ArcSwap;
use portico_kernel::gateway::{GatewayError, GatewayResult, Plugin, PluginSpec};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One live registry slot.
struct Slot<D, P> {
    /// Position in the latest descriptor table; `list` orders by it so that
    /// equal-order filters keep their declaration sequence.
    seq: usize,
    spec: D,
    instance: Arc<P>,
}

impl<D: Clone, P> Clone for Slot<D, P> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            spec: self.spec.clone(),
            instance: self.instance.clone(),
        }
    }
}

type Snapshot<D, P> = HashMap<(String, String), Slot<D, P>>;

/// Per-tenant keyed registry of live plugin instances, hot-swapped on
/// configuration change.
///
/// `D` is the descriptor type (diffed by modify-timestamp), `P` the live
/// instance type.  Exactly one writer is expected — the refresh consumer —
/// while readers are unbounded and lock-free.
pub struct DynamicContainer<D: PluginSpec, P: Plugin> {
    slots: ArcSwap<Snapshot<D, P>>,
    /// Short human label used in logs ("filter", "strategy", …).
    family: &'static str,
}

impl<D: PluginSpec, P: Plugin> DynamicContainer<D, P> {
    pub fn new(family: &'static str) -> Self {
        Self {
            slots: ArcSwap::from_pointee(HashMap::new()),
            family,
        }
    }

    /// Live instance for `(tenant, code)`, if any.
    pub fn get(&self, tenant: &str, code: &str) -> Option<Arc<P>> {
        self.slots
            .load()
            .get(&(tenant.to_string(), code.to_string()))
            .map(|slot| slot.instance.clone())
    }

    /// Live instance for `(tenant, code)`, or NotFound.
    pub fn require(&self, tenant: &str, code: &str) -> GatewayResult<Arc<P>> {
        self.get(tenant, code)
            .ok_or_else(|| GatewayError::not_found(format!("{} '{code}'", self.family)))
    }

    /// Snapshot of the tenant's live instances, in descriptor-table order.
    pub fn list(&self, tenant: &str) -> Vec<Arc<P>> {
        let snapshot = self.slots.load();
        let mut slots: Vec<_> = snapshot
            .iter()
            .filter(|((t, _), _)| t.as_str() == tenant)
            .map(|(_, slot)| (slot.seq, slot.instance.clone()))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, instance)| instance).collect()
    }

    /// Number of live instances across all tenants.
    pub fn len(&self) -> usize {
        self.slots.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.load().is_empty()
    }

    /// Apply a refreshed descriptor table.
    ///
    /// Upsert-only: a descriptor creates its instance on first sighting and
    /// replaces it when the modify-timestamp differs from the live one;
    /// entries absent from the table stay live until [`remove`](Self::remove)
    /// or [`shutdown`](Self::shutdown).  A build failure is logged with the
    /// plugin identity and leaves the previous instance (if any) in service.
    ///
    /// Must only be called from the single writer path.
    pub async fn apply<F>(&self, table: &[D], build: F)
    where
        F: Fn(&D) -> GatewayResult<P>,
    {
        let current = self.slots.load_full();
        let mut next: Snapshot<D, P> = (*current).clone();
        let mut superseded: Vec<(String, String, Arc<P>)> = Vec::new();

        for (seq, spec) in table.iter().enumerate() {
            let key = (spec.tenant().to_string(), spec.code().to_string());
            let unchanged = matches!(
                next.get(&key),
                Some(slot) if slot.spec.modified_at() == spec.modified_at()
            );
            if unchanged {
                // Only refresh its position in the table.
                if let Some(slot) = next.get_mut(&key) {
                    slot.seq = seq;
                }
                continue;
            }

            let had_instance = next.contains_key(&key);
            match build(spec) {
                Ok(instance) => {
                    let old = next.insert(
                        key.clone(),
                        Slot {
                            seq,
                            spec: spec.clone(),
                            instance: Arc::new(instance),
                        },
                    );
                    if let Some(old) = old {
                        superseded.push((key.0, key.1, old.instance));
                    } else {
                        info!(
                            family = self.family,
                            tenant = %spec.tenant(),
                            code = %spec.code(),
                            kind = %spec.kind(),
                            "plugin instance created"
                        );
                    }
                }
                Err(e) => {
                    // Fatal for this plugin only; the container and the
                    // previous instance keep running.
                    error!(
                        family = self.family,
                        tenant = %spec.tenant(),
                        code = %spec.code(),
                        kind = %spec.kind(),
                        retained = had_instance,
                        error = %e,
                        "plugin construction failed"
                    );
                    if let Some(slot) = next.get_mut(&key) {
                        slot.seq = seq;
                    }
                }
            }
        }

        // Publish the new snapshot before tearing anything down, so new
        // lookups already see the replacements.
        self.slots.store(Arc::new(next));

        for (tenant, code, old) in superseded {
            info!(
                family = self.family,
                tenant = %tenant,
                code = %code,
                "plugin instance replaced"
            );
            if let Err(e) = old.destroy().await {
                warn!(
                    family = self.family,
                    tenant = %tenant,
                    code = %code,
                    error = %e,
                    "failed to destroy superseded plugin instance"
                );
            }
        }
    }

    /// Explicitly remove and destroy one instance.
    pub async fn remove(&self, tenant: &str, code: &str) {
        let key = (tenant.to_string(), code.to_string());
        let current = self.slots.load_full();
        if !current.contains_key(&key) {
            return;
        }
        let mut next: Snapshot<D, P> = (*current).clone();
        let removed = next.remove(&key);
        self.slots.store(Arc::new(next));

        if let Some(slot) = removed {
            if let Err(e) = slot.instance.destroy().await {
                warn!(
                    family = self.family,
                    tenant = %tenant,
                    code = %code,
                    error = %e,
                    "failed to destroy removed plugin instance"
                );
            }
        }
    }

    /// Best-effort destroy-all.  Destruction failures are collected and
    /// logged; none of them propagates.
    pub async fn shutdown(&self) {
        let drained = self.slots.swap(Arc::new(HashMap::new()));
        let mut failures = 0usize;
        for ((tenant, code), slot) in drained.iter() {
            if let Err(e) = slot.instance.destroy().await {
                failures += 1;
                warn!(
                    family = self.family,
                    tenant = %tenant,
                    code = %code,
                    error = %e,
                    "failed to destroy plugin instance during shutdown"
                );
            }
        }
        info!(
            family = self.family,
            destroyed = drained.len() - failures,
            failed = failures,
            "plugin container shut down"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
