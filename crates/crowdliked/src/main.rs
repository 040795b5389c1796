//! Crowdlike Daemon - session host for the behavioral feedback dashboard.
//!
//! Owns the live profile per identity, persists it between sessions, and
//! serves the dashboard API on localhost.

use anyhow::Result;
use crowdliked::config::DaemonConfig;
use crowdliked::server::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Crowdlike Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = DaemonConfig::load();
    info!("Profiles at {}", config.data_dir.display());
    info!("Qubic RPC endpoint: {}", config.qubic_rpc_endpoint);

    server::run(AppState::new(config)).await
}
