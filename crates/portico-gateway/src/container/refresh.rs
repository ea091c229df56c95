//! Configuration refresh feed.
//!
//! External collaborators deliver *full snapshots* — the tenant topology
//! and the per-tenant filter descriptor tables — over a channel.  A single
//! consumer task owns every registry write; everything else in the gateway
//! only ever reads immutable snapshot handles.

use super::DynamicContainer;
use crate::directory::TenantDirectory;
use crate::filter::{DynamicFilter, FilterRegistry};
use crate::predicate::PredicateRegistry;
use portico_kernel::gateway::{FilterDescriptor, Tenant, TenantTable};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A full-snapshot refresh notification.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// Replaces the tenant topology.
    Tenants(Vec<Tenant>),
    /// Upserts the filter descriptor table (diffed by modify-timestamp).
    Filters(Vec<FilterDescriptor>),
}

/// Everything the refresh consumer writes to.
#[derive(Clone)]
pub struct RefreshTargets {
    pub directory: Arc<TenantDirectory>,
    pub filters: Arc<DynamicContainer<FilterDescriptor, DynamicFilter>>,
    pub filter_registry: Arc<FilterRegistry>,
    pub predicate_registry: Arc<PredicateRegistry>,
}

/// Apply one refresh event.  Also callable directly (tests, embedding) —
/// callers must uphold the single-writer discipline themselves.
pub async fn apply_event(event: RefreshEvent, targets: &RefreshTargets) {
    match event {
        RefreshEvent::Tenants(tenants) => {
            targets.directory.install(TenantTable::from_tenants(tenants));
        }
        RefreshEvent::Filters(table) => {
            info!(descriptors = table.len(), "applying filter snapshot");
            targets
                .filters
                .apply(&table, |spec| {
                    DynamicFilter::build(
                        spec.clone(),
                        &targets.filter_registry,
                        &targets.predicate_registry,
                    )
                })
                .await;
        }
    }
}

/// Spawn the single consumer task that owns all registry writes.
pub fn spawn_consumer(
    mut rx: mpsc::Receiver<RefreshEvent>,
    targets: RefreshTargets,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            apply_event(event, &targets).await;
        }
        debug!("refresh feed closed");
    })
}
