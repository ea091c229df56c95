//! Tenant directory: read-only snapshot of the tenant topology.
//!
//! The directory is refreshed out-of-band by the refresh consumer; lookups
//! load the current snapshot without any locking.

use arc_swap::ArcSwap;
use portico_kernel::gateway::{Tenant, TenantTable};
use std::sync::Arc;
use tracing::info;

/// Lock-free, swap-on-refresh view of the tenant topology.
pub struct TenantDirectory {
    table: ArcSwap<TenantTable>,
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(TenantTable::empty()),
        }
    }

    /// Install a refreshed topology snapshot.
    pub fn install(&self, table: TenantTable) {
        info!(tenants = table.len(), "tenant topology installed");
        self.table.store(Arc::new(table));
    }

    /// Look up a tenant by code in the current snapshot.
    pub fn lookup(&self, code: &str) -> Option<Arc<Tenant>> {
        self.table.load().get(code)
    }
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}
