//! Gateway kernel contract.
//!
//! This module defines the *trait interfaces and data types* for the Portico
//! edge gateway.  No concrete implementations live here — those belong in
//! `portico-gateway` (runtime).
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              portico-kernel  (this module)                  │
//! │  GatewayFilter trait + Next   Predicate trait               │
//! │  Plugin / PluginSpec traits   descriptor types              │
//! │  Tenant / Application / Module topology                     │
//! │  RequestContext + body types  GatewayError                  │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              portico-gateway  (runtime crate)               │
//! │  RouteResolver  (specificity scoring)                       │
//! │  DynamicContainer  (hot-swap plugin registry)               │
//! │  Filter pipeline + built-in filter / predicate kinds        │
//! │  Dispatcher  (axum HTTP server + reqwest proxy)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod filter;
pub mod plugin;
pub mod predicate;
pub mod tenancy;
pub mod types;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use error::{GatewayError, GatewayResult};
pub use filter::{GatewayFilter, Next};
pub use plugin::{
    FilterDescriptor, Plugin, PluginDescriptor, PluginParams, PluginSpec, PredicateDescriptor,
};
pub use predicate::Predicate;
pub use tenancy::{Application, ApplicationBinding, Module, TargetBase, Tenant, TenantTable};
pub use types::{
    ByteStream, DisposeGuard, GatewayRequest, GatewayResponse, GuardedStream, Headers, HttpMethod,
    OriginUri, RequestContext, ResponseBody, RouteTarget, UpstreamBody, UpstreamResponse,
};
