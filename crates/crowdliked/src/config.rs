//! Configuration for crowdliked.
//!
//! Loads settings from /etc/crowdlike/config.toml, then the user config
//! directory, then falls back to defaults. A malformed file logs a warning
//! and is treated as absent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// System-wide config file path.
pub const CONFIG_PATH: &str = "/etc/crowdlike/config.toml";

/// Default public Qubic testnet RPC.
pub const QUBIC_PUBLIC_RPC: &str = "https://testnet-rpc.qubicdev.com";

/// Default market-data API base.
pub const MARKET_API_BASE: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Where per-user profile files live.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Listen address for the HTTP API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Qubic RPC endpoint to poll for network status.
    #[serde(default = "default_qubic_rpc_endpoint")]
    pub qubic_rpc_endpoint: String,

    /// Market-data API base URL.
    #[serde(default = "default_market_api_base")]
    pub market_api_base: String,

    /// Timeout for RPC status/balance calls.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,

    /// Timeout for market-data calls.
    #[serde(default = "default_market_timeout")]
    pub market_timeout_secs: u64,

    /// Cap on cached tick/price history points per profile.
    #[serde(default = "default_max_history_points")]
    pub max_history_points: usize,
}

fn default_data_dir() -> PathBuf {
    crowdlike_common::storage::default_data_dir()
}

fn default_bind_addr() -> String {
    // Localhost only; the dashboard frontend proxies to it.
    "127.0.0.1:7412".to_string()
}

fn default_qubic_rpc_endpoint() -> String {
    QUBIC_PUBLIC_RPC.to_string()
}

fn default_market_api_base() -> String {
    MARKET_API_BASE.to_string()
}

fn default_rpc_timeout() -> u64 {
    8
}

fn default_market_timeout() -> u64 {
    12
}

fn default_max_history_points() -> usize {
    30
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind_addr: default_bind_addr(),
            qubic_rpc_endpoint: default_qubic_rpc_endpoint(),
            market_api_base: default_market_api_base(),
            rpc_timeout_secs: default_rpc_timeout(),
            market_timeout_secs: default_market_timeout(),
            max_history_points: default_max_history_points(),
        }
    }
}

impl DaemonConfig {
    /// Candidate config paths, first hit wins.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("crowdlike/config.toml"));
        }
        paths
    }

    /// Load from disk, falling back to defaults on any failure.
    pub fn load() -> Self {
        for path in Self::candidate_paths() {
            let Ok(raw) = fs::read_to_string(&path) else {
                continue;
            };
            match toml::from_str::<DaemonConfig>(&raw) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Ignoring malformed config {}: {}", path.display(), e);
                }
            }
        }
        DaemonConfig::default()
    }

    /// Parse a config document directly (used by tests).
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:7412");
        assert_eq!(config.qubic_rpc_endpoint, QUBIC_PUBLIC_RPC);
        assert_eq!(config.rpc_timeout_secs, 8);
        assert_eq!(config.market_timeout_secs, 12);
        assert_eq!(config.max_history_points, 30);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = DaemonConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:9000"
            rpc_timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.rpc_timeout_secs, 3);
        assert_eq!(config.market_api_base, MARKET_API_BASE);
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(DaemonConfig::from_toml_str("bind_addr = [").is_err());
    }
}
