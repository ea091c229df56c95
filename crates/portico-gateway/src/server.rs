//! Axum-based gateway server wiring.
//!
//! [`GatewayServer`] assembles the tenant directory, the dynamic filter
//! container, the filter pipeline, and the refresh consumer into a running
//! axum service whose fallback handler is the request dispatcher.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check — always `200 OK`. |
//! | `ANY`  | anything else | Tenant-aware dispatch and proxying. |

use crate::config::GatewayServerConfig;
use crate::container::refresh::{apply_event, spawn_consumer, RefreshEvent, RefreshTargets};
use crate::container::DynamicContainer;
use crate::directory::TenantDirectory;
use crate::dispatch;
use crate::filter::builtin_filters;
use crate::filter::global::{HttpProxyFilter, ResponseWritingFilter};
use crate::pipeline::FilterPipeline;
use crate::predicate::builtin_predicates;
use crate::state::AppState;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Capacity of the refresh feed channel; snapshots are coarse-grained and
/// infrequent.
const REFRESH_FEED_CAPACITY: usize = 16;

/// High-level gateway server.
pub struct GatewayServer {
    config: GatewayServerConfig,
}

impl GatewayServer {
    pub fn new(config: GatewayServerConfig) -> Self {
        Self { config }
    }

    /// Wire up state, router, and the refresh consumer.
    pub fn build(&self) -> GatewayRuntime {
        let targets = RefreshTargets {
            directory: Arc::new(TenantDirectory::new()),
            filters: Arc::new(DynamicContainer::new("filter")),
            filter_registry: Arc::new(builtin_filters()),
            predicate_registry: Arc::new(builtin_predicates()),
        };

        let pipeline = FilterPipeline::new(
            Arc::new(ResponseWritingFilter::new()),
            Arc::new(HttpProxyFilter::new(self.config.proxy_timeout)),
        );

        let state = AppState {
            config: Arc::new(self.config.clone()),
            directory: targets.directory.clone(),
            filters: targets.filters.clone(),
            pipeline: Arc::new(pipeline),
        };

        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_FEED_CAPACITY);
        let refresh_task = spawn_consumer(refresh_rx, targets.clone());

        let router = Router::new()
            .route("/health", get(health))
            .fallback(dispatch::dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        GatewayRuntime {
            router,
            state,
            refresh_tx,
            targets,
            refresh_task,
        }
    }

    /// Build and serve until the process exits.
    pub async fn start(self) -> std::io::Result<()> {
        let runtime = self.build();
        runtime.serve().await
    }
}

/// A fully wired gateway: router, shared state, and the refresh feed.
pub struct GatewayRuntime {
    pub router: Router,
    pub state: AppState,
    /// Producer half of the refresh feed; external configuration sources
    /// push full snapshots here.
    pub refresh_tx: mpsc::Sender<RefreshEvent>,
    targets: RefreshTargets,
    refresh_task: JoinHandle<()>,
}

impl GatewayRuntime {
    /// Apply a refresh event synchronously, bypassing the feed channel.
    ///
    /// For embedding and tests; the caller takes over the single-writer
    /// discipline the consumer task normally provides.
    pub async fn apply(&self, event: RefreshEvent) {
        apply_event(event, &self.targets).await;
    }

    /// Bind and serve until the listener fails, then tear down the plugin
    /// container.
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = format!("0.0.0.0:{}", self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "portico gateway listening");

        let result = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;

        self.refresh_task.abort();
        self.state.filters.shutdown().await;
        result
    }
}

/// `GET /health` — liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "portico-gateway" }))
}
