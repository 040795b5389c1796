//! API routes for crowdliked.
//!
//! Every mutation goes through the session manager and the common mutation
//! API; handlers never poke profile fields directly. Validation failures
//! come back as `ok: false` with a human-readable warning and leave state
//! unchanged - the page keeps rendering with whatever data it has.

use crate::server::AppState;
use crate::providers::qubic::{
    balance_summary, pick_price, pick_tick, status_summary, update_market_history, SummaryRow,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use crowdlike_common::achievements::{achievements_catalog, Achievement};
use crowdlike_common::mutations::{
    apply_simulation_pulse, grant_xp, today_utc, CurrentScenario, XpSource,
};
use crowdlike_common::progression::{
    compute_best_streak, compute_streak, last_test_attempt, subject_xp_breakdown, xp_by_day,
    xp_progress, SubjectStats,
};
use crowdlike_common::trading::{buy_tokens, sell_tokens};
use crowdlike_common::{TestAttempt, TokenTrade, UserState};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Shared view models
// ============================================================================

/// Profile header: everything the HUD needs in one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub email: Option<String>,
    pub level: u32,
    pub xp: u64,
    pub xp_into_level: u64,
    pub xp_needed: u64,
    pub xp_fraction: f64,
    pub coins: u64,
    pub gems: u64,
    pub token_balance: f64,
    pub streak: u32,
    pub best_streak: u32,
    pub tests_taken: u64,
    pub days_active: usize,
}

impl ProfileView {
    pub fn from_state(state: &UserState, today: NaiveDate) -> Self {
        let progress = xp_progress(state.xp);
        Self {
            username: state.username.clone(),
            email: state.email.clone(),
            level: progress.level,
            xp: state.xp,
            xp_into_level: progress.xp_into_level,
            xp_needed: progress.xp_needed,
            xp_fraction: progress.fraction,
            coins: state.coins,
            gems: state.gems,
            token_balance: state.token_balance,
            streak: compute_streak(&state.days_active, today),
            best_streak: compute_best_streak(&state.days_active),
            tests_taken: state.tests_taken,
            days_active: state.days_active.len(),
        }
    }
}

// ============================================================================
// Session routes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub new_account: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn session_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/session/login", post(login))
        .route("/v1/session/reset", post(reset_account))
        .route("/v1/profile/:user", get(profile))
        .route("/v1/dashboard/:user", get(dashboard))
}

async fn login(State(state): State<AppStateArc>, Json(req): Json<LoginRequest>) -> Json<LoginResponse> {
    use crate::session::LoginOutcome;

    let outcome = state
        .sessions
        .login(crate::session::LoginRequest {
            username: req.username,
            email: req.email,
            password: req.password,
            confirm: req.confirm,
        })
        .await;

    let response = match outcome {
        LoginOutcome::Success { user_id, new_account } => LoginResponse {
            ok: true,
            user_id: Some(user_id),
            new_account,
            warning: None,
        },
        LoginOutcome::MissingUsername => LoginResponse {
            ok: false,
            user_id: None,
            new_account: false,
            warning: Some("Enter a username.".to_string()),
        },
        LoginOutcome::PasswordRequired => LoginResponse {
            ok: false,
            user_id: None,
            new_account: false,
            warning: Some("Enter your password.".to_string()),
        },
        LoginOutcome::WrongPassword => LoginResponse {
            ok: false,
            user_id: None,
            new_account: false,
            warning: Some("Wrong password.".to_string()),
        },
        LoginOutcome::PasswordRejected { reason } => LoginResponse {
            ok: false,
            user_id: None,
            new_account: false,
            warning: Some(reason),
        },
    };
    Json(response)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub user_id: String,
}

async fn reset_account(
    State(state): State<AppStateArc>,
    Json(req): Json<ResetRequest>,
) -> Json<ResetResponse> {
    let user_id = state.sessions.reset_account(&req.username).await;
    Json(ResetResponse { ok: true, user_id })
}

async fn profile(State(state): State<AppStateArc>, Path(user): Path<String>) -> Json<ProfileView> {
    let snapshot = state.sessions.snapshot(&user).await;
    Json(ProfileView::from_state(&snapshot, today_utc()))
}

/// Everything a dashboard render needs in one response.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub profile: ProfileView,
    pub achievements: Vec<Achievement>,
    pub xp_by_day: BTreeMap<String, i64>,
    pub subjects: BTreeMap<String, SubjectStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<TestAttempt>,
    pub recent_trades: Vec<TokenTrade>,
}

async fn dashboard(State(state): State<AppStateArc>, Path(user): Path<String>) -> Json<DashboardView> {
    let snapshot = state.sessions.snapshot(&user).await;
    let today = today_utc();

    let recent_trades: Vec<TokenTrade> =
        snapshot.token_trades.iter().rev().take(5).cloned().collect();

    Json(DashboardView {
        profile: ProfileView::from_state(&snapshot, today),
        achievements: achievements_catalog(&snapshot, today),
        xp_by_day: xp_by_day(&snapshot.xp_events),
        subjects: subject_xp_breakdown(&snapshot.test_history),
        last_attempt: last_test_attempt(&snapshot).cloned(),
        recent_trades,
    })
}

// ============================================================================
// Progress routes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GrantXpRequest {
    pub user: String,
    pub amount: u32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantXpResponse {
    pub ok: bool,
    pub xp: u64,
    pub coins: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn progress_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/xp/grant", post(xp_grant))
        .route("/v1/test/attempt", post(test_attempt))
        .route("/v1/scenario/select", post(scenario_select))
        .route("/v1/simulate", post(simulate))
        .route("/v1/simulate/random", post(simulate_random))
}

async fn xp_grant(
    State(state): State<AppStateArc>,
    Json(req): Json<GrantXpRequest>,
) -> Json<GrantXpResponse> {
    let label = req.source.as_deref().unwrap_or("Simulation");
    let Some(source) = XpSource::from_label(label) else {
        let snapshot = state.sessions.snapshot(&req.user).await;
        return Json(GrantXpResponse {
            ok: false,
            xp: snapshot.xp,
            coins: snapshot.coins,
            warning: Some(format!("Unknown XP source: {}", label)),
        });
    };

    let description = req.description.unwrap_or_default();
    let (xp, coins) = state
        .sessions
        .with_session(&req.user, |profile| {
            grant_xp(profile, req.amount, source, &description);
            (profile.xp, profile.coins)
        })
        .await;
    Json(GrantXpResponse {
        ok: true,
        xp,
        coins,
        warning: None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestAttemptRequest {
    pub user: String,
    pub test_id: String,
    pub name: String,
    pub subject: String,
    pub correct: i64,
    pub total: i64,
    #[serde(default)]
    pub time_sec: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestAttemptResponse {
    pub ok: bool,
    pub attempt: TestAttempt,
    pub xp: u64,
    pub tests_taken: u64,
}

async fn test_attempt(
    State(state): State<AppStateArc>,
    Json(req): Json<TestAttemptRequest>,
) -> Json<TestAttemptResponse> {
    let (attempt, xp, tests_taken) = state
        .sessions
        .with_session(&req.user, |profile| {
            let attempt = crowdlike_common::mutations::record_test_attempt(
                profile,
                &req.test_id,
                &req.name,
                &req.subject,
                req.correct,
                req.total,
                req.time_sec,
            );
            (attempt, profile.xp, profile.tests_taken)
        })
        .await;

    info!(
        "[T]  {} scored {:.1}% on {} (+{} XP)",
        req.user, attempt.percent, attempt.name, attempt.xp_gained
    );
    Json(TestAttemptResponse {
        ok: true,
        attempt,
        xp,
        tests_taken,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectScenarioRequest {
    pub user: String,
    pub test_id: String,
    pub name: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectScenarioResponse {
    pub ok: bool,
}

async fn scenario_select(
    State(state): State<AppStateArc>,
    Json(req): Json<SelectScenarioRequest>,
) -> Json<SelectScenarioResponse> {
    state
        .sessions
        .set_scenario(
            &req.user,
            CurrentScenario {
                test_id: req.test_id,
                name: req.name,
                subject: req.subject,
            },
        )
        .await;
    Json(SelectScenarioResponse { ok: true })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationRequest {
    pub user: String,
    pub scenario: String,
    pub xp: u32,
    pub token_delta: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResponse {
    pub ok: bool,
    pub xp: u64,
    pub coins: u64,
    pub token_balance: f64,
    pub xp_gained: u32,
    pub token_delta: f64,
}

async fn simulate(
    State(state): State<AppStateArc>,
    Json(req): Json<SimulationRequest>,
) -> Json<SimulationResponse> {
    let (xp, coins, token_balance) = state
        .sessions
        .with_session(&req.user, |profile| {
            apply_simulation_pulse(profile, &req.scenario, req.xp, req.token_delta);
            (profile.xp, profile.coins, profile.token_balance)
        })
        .await;
    Json(SimulationResponse {
        ok: true,
        xp,
        coins,
        token_balance,
        xp_gained: req.xp,
        token_delta: req.token_delta,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomSimulationRequest {
    pub user: String,
}

async fn simulate_random(
    State(state): State<AppStateArc>,
    Json(req): Json<RandomSimulationRequest>,
) -> Json<SimulationResponse> {
    let (xp_gain, token_delta) = {
        let mut rng = rand::thread_rng();
        let xp_gain = rng.gen_range(50..=200);
        let token_delta = (rng.gen_range(-20.0..50.0) * 100.0_f64).round() / 100.0;
        (xp_gain, token_delta)
    };

    let (xp, coins, token_balance) = state
        .sessions
        .with_session(&req.user, |profile| {
            apply_simulation_pulse(profile, "Random behavior", xp_gain, token_delta);
            (profile.xp, profile.coins, profile.token_balance)
        })
        .await;
    Json(SimulationResponse {
        ok: true,
        xp,
        coins,
        token_balance,
        xp_gained: xp_gain,
        token_delta,
    })
}

// ============================================================================
// Trade routes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub user: String,
    pub amount: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<TokenTrade>,
    pub coins: u64,
    pub token_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn trade_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/trade/buy", post(trade_buy))
        .route("/v1/trade/sell", post(trade_sell))
        .route("/v1/trades/:user", get(trade_log))
}

async fn trade_buy(State(state): State<AppStateArc>, Json(req): Json<TradeRequest>) -> Json<TradeResponse> {
    let response = state
        .sessions
        .with_session(&req.user, |profile| {
            match buy_tokens(profile, req.amount, req.price) {
                Ok(trade) => TradeResponse {
                    ok: true,
                    trade: Some(trade),
                    coins: profile.coins,
                    token_balance: profile.token_balance,
                    warning: None,
                },
                Err(e) => TradeResponse {
                    ok: false,
                    trade: None,
                    coins: profile.coins,
                    token_balance: profile.token_balance,
                    warning: Some(e.to_string()),
                },
            }
        })
        .await;
    Json(response)
}

async fn trade_sell(State(state): State<AppStateArc>, Json(req): Json<TradeRequest>) -> Json<TradeResponse> {
    let response = state
        .sessions
        .with_session(&req.user, |profile| {
            match sell_tokens(profile, req.amount, req.price) {
                Ok(trade) => TradeResponse {
                    ok: true,
                    trade: Some(trade),
                    coins: profile.coins,
                    token_balance: profile.token_balance,
                    warning: None,
                },
                Err(e) => TradeResponse {
                    ok: false,
                    trade: None,
                    coins: profile.coins,
                    token_balance: profile.token_balance,
                    warning: Some(e.to_string()),
                },
            }
        })
        .await;
    Json(response)
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeLogResponse {
    pub trades: Vec<TokenTrade>,
}

async fn trade_log(State(state): State<AppStateArc>, Path(user): Path<String>) -> Json<TradeLogResponse> {
    let snapshot = state.sessions.snapshot(&user).await;
    Json(TradeLogResponse {
        trades: snapshot.token_trades,
    })
}

// ============================================================================
// Qubic routes
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct QubicStatusResponse {
    pub ok: bool,
    pub summary: Vec<SummaryRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn qubic_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/qubic/status", get(qubic_status))
        .route("/v1/qubic/balance/:identity", get(qubic_balance))
        .route("/v1/qubic/refresh", post(qubic_refresh))
}

async fn qubic_status(State(state): State<AppStateArc>) -> Json<QubicStatusResponse> {
    let outcome = state.qubic.fetch_status().await;
    let response = match outcome.object() {
        Some(map) => QubicStatusResponse {
            ok: true,
            summary: status_summary(map),
            fetched_at: map
                .get("_fetched_at")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            warning: None,
        },
        None => QubicStatusResponse {
            ok: false,
            summary: Vec::new(),
            fetched_at: None,
            warning: outcome
                .error_message()
                .map(str::to_string)
                .or_else(|| Some("Live RPC not reachable right now.".to_string())),
        },
    };
    Json(response)
}

async fn qubic_balance(
    State(state): State<AppStateArc>,
    Path(identity): Path<String>,
) -> Json<QubicStatusResponse> {
    let outcome = state.qubic.fetch_balance(&identity).await;
    let response = match outcome.object() {
        Some(map) => QubicStatusResponse {
            ok: true,
            summary: balance_summary(map),
            fetched_at: map
                .get("_fetched_at")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            warning: None,
        },
        None => QubicStatusResponse {
            ok: false,
            summary: Vec::new(),
            fetched_at: None,
            warning: outcome.error_message().map(str::to_string),
        },
    };
    Json(response)
}

#[derive(Debug, Clone, Deserialize)]
pub struct QubicRefreshRequest {
    pub user: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QubicRefreshResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub tick_points: usize,
    pub price_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Poll the RPC and fold fresh samples into the user's display caches.
async fn qubic_refresh(
    State(state): State<AppStateArc>,
    Json(req): Json<QubicRefreshRequest>,
) -> Json<QubicRefreshResponse> {
    let status = state.qubic.fetch_status().await;
    let tick_info = state.qubic.fetch_tick().await;

    let tick = pick_tick(&status, &tick_info);
    let price = pick_price(&status);
    let max_points = state.config.max_history_points;
    let warning = status.error_message().map(str::to_string);

    let (tick_points, price_points) = state
        .sessions
        .with_session(&req.user, |profile| {
            update_market_history(profile, &status, &tick_info, max_points);
            (
                profile.qubic_tick_history.len(),
                profile.qubic_price_history.len(),
            )
        })
        .await;

    Json(QubicRefreshResponse {
        ok: warning.is_none(),
        tick,
        price,
        tick_points,
        price_points,
        warning,
    })
}

// ============================================================================
// Market routes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MarketPriceQuery {
    pub ids: String,
    #[serde(default = "default_vs")]
    pub vs: String,
}

fn default_vs() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn market_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/market/price", get(market_price))
        .route("/v1/market/chart/:coin_id", get(market_chart))
}

fn market_response(outcome: crate::providers::FetchOutcome) -> MarketResponse {
    match outcome {
        crate::providers::FetchOutcome::Payload(data) => MarketResponse {
            ok: true,
            data: Some(data),
            warning: None,
        },
        crate::providers::FetchOutcome::Unavailable { message } => MarketResponse {
            ok: false,
            data: None,
            warning: Some(message),
        },
    }
}

async fn market_price(
    State(state): State<AppStateArc>,
    Query(query): Query<MarketPriceQuery>,
) -> Json<MarketResponse> {
    Json(market_response(
        state.market.simple_price(&query.ids, &query.vs).await,
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartQuery {
    #[serde(default = "default_vs")]
    pub vs: String,
    #[serde(default = "default_chart_days")]
    pub days: u32,
}

fn default_chart_days() -> u32 {
    7
}

async fn market_chart(
    State(state): State<AppStateArc>,
    Path(coin_id): Path<String>,
    Query(query): Query<MarketChartQuery>,
) -> Json<MarketResponse> {
    Json(market_response(
        state.market.market_chart(&coin_id, &query.vs, query.days).await,
    ))
}

// ============================================================================
// Health routes
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
