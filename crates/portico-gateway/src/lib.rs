//! `portico-gateway` — tenant-aware edge gateway runtime.
//!
//! This crate provides the concrete implementations of the contracts
//! defined in `portico-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |-----------------|----------------|
//! | route resolution | [`route::resolve`] (path-specificity scoring) |
//! | [`GatewayFilter`](portico_kernel::gateway::GatewayFilter) | [`filter`] built-ins + [`filter::DynamicFilter`] |
//! | [`Predicate`](portico_kernel::gateway::Predicate) | [`predicate`] built-ins |
//! | [`Plugin`](portico_kernel::gateway::Plugin) lifecycle | [`container::DynamicContainer`] |
//! | dispatch & error translation | [`dispatch`] |
//!
//! [`server::GatewayServer`] wires everything into an axum HTTP service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use portico_gateway::config::GatewayServerConfig;
//! use portico_gateway::server::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::new(GatewayServerConfig {
//!         port: 3000,
//!         ..Default::default()
//!     });
//!     server.start().await.unwrap();
//! }
//! ```

pub mod config;
pub mod container;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod predicate;
pub mod route;
pub mod server;
pub mod state;

// Re-export the kernel contract types for convenience.
pub use portico_kernel::gateway;
