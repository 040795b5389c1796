//! User state schema v0.4.0 - the persisted profile record.
//!
//! One `UserState` per identity. The field set here is the single source of
//! truth for what a profile contains; `UserState::default()` provides the
//! values every missing key falls back to on load. Unknown keys found in a
//! stored file are kept verbatim in `extra` so older and newer builds can
//! round-trip each other's files.
//!
//! JSON key names (including the short `ts` key on XP events) are part of the
//! on-disk contract and must not be renamed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Current UTC time as an ISO-8601 string with second precision.
pub fn utc_timestamp_seconds() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// One XP grant, appended for every successful `grant_xp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpEvent {
    /// Timestamp, UTC seconds. Short key for file compatibility.
    pub ts: String,
    /// Source label ("Login", "Test", "Simulation", ...).
    pub source: String,
    pub amount: i64,
    pub description: String,
}

/// One recorded test/scenario attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub timestamp: String,
    pub test_id: String,
    pub name: String,
    pub subject: String,
    pub correct: u32,
    pub total: u32,
    /// Percentage score, rounded to 1 decimal.
    pub percent: f64,
    /// Seconds spent. Recorded as given, including absurd values.
    pub time_sec: i64,
    pub xp_gained: u32,
}

/// Buy or sell side of a token trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
        }
    }
}

/// One entry of the append-only trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTrade {
    pub timestamp: String,
    pub action: TradeAction,
    /// Token amount, 2 decimals.
    pub amount: f64,
    /// Price in coins per token, 2 decimals.
    pub price: f64,
    /// Signed coin change (negative for buys).
    pub coin_delta: i64,
    /// Signed token change, 2 decimals (negative for sells).
    pub token_delta: f64,
}

/// Cached network tick sample for sparkline display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickPoint {
    pub ts: String,
    pub value: i64,
}

/// Cached price sample, 6 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: String,
    pub value: f64,
}

/// The full per-identity profile.
///
/// Field declaration order matches the stored file layout. Password fields
/// are only present once a password has been set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub gems: u64,

    #[serde(default)]
    pub tests_taken: u64,
    #[serde(default)]
    pub test_history: Vec<TestAttempt>,
    #[serde(default)]
    pub xp_events: Vec<XpEvent>,
    /// Distinct ISO dates with tracked activity, sorted ascending.
    #[serde(default)]
    pub days_active: Vec<String>,

    /// Reserved extension point (date -> completed task ids).
    #[serde(default)]
    pub daily_tasks_done: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub token_balance: f64,
    #[serde(default)]
    pub token_trades: Vec<TokenTrade>,

    #[serde(default)]
    pub qubic_identity: String,
    #[serde(default)]
    pub qubic_tick_history: Vec<TickPoint>,
    #[serde(default)]
    pub qubic_price_history: Vec<PricePoint>,

    /// Reserved for assistant chat transcripts.
    #[serde(default)]
    pub ai_chat_history: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_pw_salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_pw_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_pw_rounds: Option<u32>,

    /// Unknown keys from stored files, preserved unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_username() -> String {
    "Login".to_string()
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            username: default_username(),
            email: None,
            xp: 0,
            coins: 0,
            gems: 0,
            tests_taken: 0,
            test_history: Vec::new(),
            xp_events: Vec::new(),
            days_active: Vec::new(),
            daily_tasks_done: BTreeMap::new(),
            token_balance: 0.0,
            token_trades: Vec::new(),
            qubic_identity: String::new(),
            qubic_tick_history: Vec::new(),
            qubic_price_history: Vec::new(),
            ai_chat_history: Vec::new(),
            auth_pw_salt: None,
            auth_pw_hash: None,
            auth_pw_rounds: None,
            extra: Map::new(),
        }
    }
}

impl UserState {
    /// Fresh default state carrying only the username forward.
    ///
    /// Used by account reset: everything else (XP, history, password) is
    /// dropped.
    pub fn fresh_for(username: &str) -> Self {
        let mut state = Self::default();
        if !username.is_empty() {
            state.username = username.to_string();
        }
        state
    }
}
