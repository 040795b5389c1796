//! Qubic RPC provider - network status, tick, and balance lookups.
//!
//! Responses are treated as opaque JSON objects; field extraction is
//! best-effort over ordered candidate key lists. Successful payloads get a
//! `_fetched_at` stamp so display surfaces can show freshness.

use super::{coerce_number, pick_first, FetchOutcome};
use chrono::Utc;
use crowdlike_common::state::{PricePoint, TickPoint, UserState};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Candidate keys for a tick/height-like value.
pub const TICK_KEYS: &[&str] = &["tick", "currentTick", "latestTick"];

/// Candidate keys for a USD price value.
pub const PRICE_KEYS: &[&str] = &["price", "priceUsd", "priceUSD"];

fn utc_timestamp_z() -> String {
    format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S"))
}

/// HTTP client for one RPC endpoint.
#[derive(Debug, Clone)]
pub struct QubicClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl QubicClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_object(&self, url: &str, friendly_404: Option<&str>) -> FetchOutcome {
        let response = match self
            .http
            .get(url)
            .header("User-Agent", concat!("crowdlike/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("RPC request to {} failed: {}", url, e);
                return FetchOutcome::unavailable(e.to_string());
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            if let Some(message) = friendly_404 {
                return FetchOutcome::unavailable(message);
            }
        }
        if !response.status().is_success() {
            return FetchOutcome::unavailable(format!("RPC returned {}", response.status()));
        }

        match response.json::<Value>().await {
            Ok(Value::Object(mut map)) => {
                map.insert("_fetched_at".to_string(), Value::String(utc_timestamp_z()));
                FetchOutcome::Payload(Value::Object(map))
            }
            Ok(_) => FetchOutcome::unavailable("Unexpected payload shape"),
            Err(e) => FetchOutcome::unavailable(e.to_string()),
        }
    }

    /// `/v1/status` - general network status.
    pub async fn fetch_status(&self) -> FetchOutcome {
        self.get_object(&format!("{}/v1/status", self.endpoint), None).await
    }

    /// `/v1/tick` - current tick. The public testnet RPC commonly does not
    /// expose this, so 404 gets a friendly message.
    pub async fn fetch_tick(&self) -> FetchOutcome {
        self.get_object(
            &format!("{}/v1/tick", self.endpoint),
            Some("Tick endpoint /v1/tick not available on this RPC"),
        )
        .await
    }

    /// `/v1/balances/{identity}` - balance for an address id.
    pub async fn fetch_balance(&self, identity: &str) -> FetchOutcome {
        let identity = identity.trim();
        if identity.is_empty() {
            return FetchOutcome::unavailable("No identity provided");
        }
        self.get_object(&format!("{}/v1/balances/{}", self.endpoint, identity), None)
            .await
    }
}

/// Compact display formatting for RPC values.
pub fn format_qubic_value(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::String(s) if s.is_empty() => "n/a".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                group_thousands(i)
            } else if let Some(f) = n.as_f64() {
                format_float(f)
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn format_float(value: f64) -> String {
    let fixed = format!("{:.6}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (trimmed, None),
    };
    let grouped = match int_part.parse::<i64>() {
        Ok(i) => group_thousands(i),
        Err(_) => int_part.to_string(),
    };
    match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}

/// One labeled metric for a status/balance table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
}

fn build_summary(map: &Map<String, Value>, fields: &[(&str, &[&str])]) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for (label, keys) in fields {
        if let Some(value) = pick_first(map, keys) {
            rows.push(SummaryRow {
                metric: label.to_string(),
                value: format_qubic_value(value),
            });
        }
    }
    rows
}

/// Common status fields, skipping whatever this RPC does not report.
pub fn status_summary(map: &Map<String, Value>) -> Vec<SummaryRow> {
    build_summary(
        map,
        &[
            ("Network", &["network", "networkName", "chain"]),
            ("Epoch", &["epoch", "currentEpoch"]),
            ("Tick", TICK_KEYS),
            ("Active addresses", &["activeAddresses"]),
            ("Circulating supply", &["circulatingSupply", "supply"]),
            ("Price (USD)", &["price", "priceUsd"]),
            ("Market cap (USD)", &["marketCap", "marketCapUsd"]),
            ("Timestamp", &["timestamp", "time", "updatedAt"]),
        ],
    )
}

/// Common balance fields.
pub fn balance_summary(map: &Map<String, Value>) -> Vec<SummaryRow> {
    build_summary(
        map,
        &[
            ("Balance", &["balance"]),
            ("Incoming amount", &["incomingAmount"]),
            ("Outgoing amount", &["outgoingAmount"]),
            ("Incoming transfers", &["numberOfIncomingTransfers"]),
            ("Outgoing transfers", &["numberOfOutgoingTransfers"]),
        ],
    )
}

/// Tick value from the tick endpoint, falling back to the status payload.
pub fn pick_tick(status: &FetchOutcome, tick_info: &FetchOutcome) -> Option<i64> {
    for outcome in [tick_info, status] {
        if let Some(map) = outcome.object() {
            if let Some(value) = pick_first(map, TICK_KEYS) {
                if let Some(n) = coerce_number(value) {
                    return Some(n as i64);
                }
            }
        }
    }
    None
}

/// USD price from the status payload.
pub fn pick_price(status: &FetchOutcome) -> Option<f64> {
    let map = status.object()?;
    let value = pick_first(map, PRICE_KEYS)?;
    coerce_number(value)
}

/// Append fresh tick/price samples to the profile's display caches.
///
/// A value identical to its immediate predecessor is not appended; both
/// histories are capped at `max_points`, oldest first out.
pub fn update_market_history(
    state: &mut UserState,
    status: &FetchOutcome,
    tick_info: &FetchOutcome,
    max_points: usize,
) {
    let ts = utc_timestamp_z();

    if let Some(tick) = pick_tick(status, tick_info) {
        let changed = state
            .qubic_tick_history
            .last()
            .map(|last| last.value != tick)
            .unwrap_or(true);
        if changed {
            state.qubic_tick_history.push(TickPoint { ts: ts.clone(), value: tick });
            if state.qubic_tick_history.len() > max_points {
                let excess = state.qubic_tick_history.len() - max_points;
                state.qubic_tick_history.drain(..excess);
            }
        }
    }

    if let Some(price) = pick_price(status) {
        let rounded = (price * 1e6).round() / 1e6;
        let changed = state
            .qubic_price_history
            .last()
            .map(|last| last.value != rounded)
            .unwrap_or(true);
        if changed {
            state.qubic_price_history.push(PricePoint { ts, value: rounded });
            if state.qubic_price_history.len() > max_points {
                let excess = state.qubic_price_history.len() - max_points;
                state.qubic_price_history.drain(..excess);
            }
        }
    }
}
