//! Shared application state injected into every request handler.

use crate::config::GatewayServerConfig;
use crate::container::DynamicContainer;
use crate::directory::TenantDirectory;
use crate::filter::DynamicFilter;
use crate::pipeline::FilterPipeline;
use portico_kernel::gateway::FilterDescriptor;
use std::sync::Arc;

/// State shared across all request handlers.
///
/// Everything here is either immutable or a snapshot-swap structure, so
/// handlers clone cheaply and never block each other.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayServerConfig>,
    /// Tenant topology, refreshed out-of-band.
    pub directory: Arc<TenantDirectory>,
    /// Per-tenant dynamic filter instances.
    pub filters: Arc<DynamicContainer<FilterDescriptor, DynamicFilter>>,
    /// Fixed global stages wrapping the dynamic filters.
    pub pipeline: Arc<FilterPipeline>,
}
