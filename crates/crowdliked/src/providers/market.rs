//! Market-data provider (CoinGecko-compatible API).
//!
//! Each endpoint sits behind a short TTL cache so one dashboard render
//! never hammers the public API; a failed fetch yields an unavailable
//! outcome for that cycle and is retried once the TTL lapses.

use super::FetchOutcome;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Cache TTL for /simple/price.
const PRICE_TTL: Duration = Duration::from_secs(60);
/// Cache TTL for /coins/markets.
const MARKETS_TTL: Duration = Duration::from_secs(90);
/// Cache TTL for /coins/{id}/market_chart.
const CHART_TTL: Duration = Duration::from_secs(180);

struct CacheEntry {
    fetched_at: Instant,
    payload: Value,
}

/// HTTP client for the market-data API.
pub struct MarketClient {
    http: reqwest::Client,
    base: String,
    timeout: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl MarketClient {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
            timeout: Duration::from_secs(timeout_secs),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn cached_get(
        &self,
        cache_key: String,
        ttl: Duration,
        path: &str,
        params: &[(&str, String)],
    ) -> FetchOutcome {
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(&cache_key) {
                if entry.fetched_at.elapsed() < ttl {
                    return FetchOutcome::Payload(entry.payload.clone());
                }
            }
        }

        let url = format!("{}{}", self.base, path);
        let response = match self
            .http
            .get(&url)
            .query(params)
            .header("User-Agent", concat!("crowdlike/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Market request to {} failed: {}", url, e);
                return FetchOutcome::unavailable(e.to_string());
            }
        };

        if !response.status().is_success() {
            return FetchOutcome::unavailable(format!("Market API returned {}", response.status()));
        }

        match response.json::<Value>().await {
            Ok(payload) => {
                let mut cache = self.cache.lock().await;
                cache.insert(
                    cache_key,
                    CacheEntry {
                        fetched_at: Instant::now(),
                        payload: payload.clone(),
                    },
                );
                FetchOutcome::Payload(payload)
            }
            Err(e) => FetchOutcome::unavailable(e.to_string()),
        }
    }

    /// `/simple/price` - spot prices with 24h context.
    pub async fn simple_price(&self, ids: &str, vs: &str) -> FetchOutcome {
        let params = [
            ("ids", ids.to_string()),
            ("vs_currencies", vs.to_string()),
            ("include_24hr_change", "true".to_string()),
            ("include_24hr_vol", "true".to_string()),
            ("include_market_cap", "true".to_string()),
            ("include_last_updated_at", "true".to_string()),
        ];
        self.cached_get(format!("price:{}:{}", ids, vs), PRICE_TTL, "/simple/price", &params)
            .await
    }

    /// `/coins/markets` - top coins by market cap.
    pub async fn markets(&self, vs: &str, per_page: u32, page: u32) -> FetchOutcome {
        let params = [
            ("vs_currency", vs.to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "1h,24h,7d".to_string()),
        ];
        self.cached_get(
            format!("markets:{}:{}:{}", vs, per_page, page),
            MARKETS_TTL,
            "/coins/markets",
            &params,
        )
        .await
    }

    /// `/coins/{id}/market_chart` - price series over `days`.
    pub async fn market_chart(&self, coin_id: &str, vs: &str, days: u32) -> FetchOutcome {
        let params = [("vs_currency", vs.to_string()), ("days", days.to_string())];
        let path = format!("/coins/{}/market_chart", coin_id);
        self.cached_get(
            format!("chart:{}:{}:{}", coin_id, vs, days),
            CHART_TTL,
            &path,
            &params,
        )
        .await
    }

    /// Drop every cached payload (used by tests).
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}
