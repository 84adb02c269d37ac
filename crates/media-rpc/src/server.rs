//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use catalog_media::{ConsistencyEngine, EntityLocks};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Requests served at once; the rest wait.
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Application state shared across handlers.
pub struct AppState {
    pub engine: Arc<ConsistencyEngine>,
    /// One mutation at a time per entity.
    pub locks: EntityLocks,
    /// Mutations hold it shared; a reconcile sweep holds it exclusively.
    pub sweep_gate: Arc<RwLock<()>>,
    /// Uploads are only accepted from files inside this directory.
    pub staging_dir: PathBuf,
    /// Bound on each operation, lock wait included.
    pub timeout: Duration,
}

impl AppState {
    pub fn new(engine: ConsistencyEngine, staging_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        let staging_dir = staging_dir.into();
        Self {
            engine: Arc::new(engine),
            locks: EntityLocks::new(),
            sweep_gate: Arc::new(RwLock::new(())),
            staging_dir: std::fs::canonicalize(&staging_dir).unwrap_or(staging_dir),
            timeout,
        }
    }
}

/// Build the router for the given state.
pub fn router(state: Arc<AppState>) -> Router {
    // Configure CORS for the admin frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
