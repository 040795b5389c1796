//! HTTP server for crowdliked.

use crate::config::DaemonConfig;
use crate::providers::market::MarketClient;
use crate::providers::qubic::QubicClient;
use crate::routes;
use crate::session::SessionManager;
use anyhow::Result;
use axum::Router;
use crowdlike_common::storage::ProfileStore;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    pub sessions: SessionManager,
    pub qubic: QubicClient,
    pub market: MarketClient,
    pub config: DaemonConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        let store = ProfileStore::new(config.data_dir.clone());
        Self {
            sessions: SessionManager::new(store),
            qubic: QubicClient::new(config.qubic_rpc_endpoint.clone(), config.rpc_timeout_secs),
            market: MarketClient::new(config.market_api_base.clone(), config.market_timeout_secs),
            config,
            start_time: Instant::now(),
        }
    }
}

/// Run the HTTP server until shutdown.
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr.clone();
    let state = Arc::new(state);

    let app = Router::new()
        .merge(routes::session_routes())
        .merge(routes::progress_routes())
        .merge(routes::trade_routes())
        .merge(routes::qubic_routes())
        .merge(routes::market_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
