//! Mutation API - the only sanctioned entry points that change a profile.
//!
//! Each operation mutates the live `UserState` in place and is atomic with
//! respect to it; the session host serializes access so no reader sees a
//! torn update. Anything representing "the user did something today" also
//! marks today active, idempotently.

use crate::state::{TestAttempt, UserState, XpEvent, utc_timestamp_seconds};
use chrono::{NaiveDate, Utc};

/// Where an XP grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpSource {
    Login,
    Test,
    Simulation,
}

impl XpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpSource::Login => "Login",
            XpSource::Test => "Test",
            XpSource::Simulation => "Simulation",
        }
    }

    /// Parse a label from an API request.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Login" => Some(XpSource::Login),
            "Test" => Some(XpSource::Test),
            "Simulation" => Some(XpSource::Simulation),
            _ => None,
        }
    }
}

impl std::fmt::Display for XpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Today's date in UTC. The impure edge for all mutation timestamps.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Round to 2 decimals (token amounts and balances).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mark a day active. Idempotent; keeps `days_active` sorted ascending.
pub fn mark_active_day(state: &mut UserState, day: NaiveDate) {
    let day = day.format("%Y-%m-%d").to_string();
    if let Err(pos) = state.days_active.binary_search(&day) {
        state.days_active.insert(pos, day);
    }
}

/// Add XP, derive coins, and log an XP event.
///
/// 1 coin per 10 XP. Zero grants are a no-op and leave the state untouched.
pub fn grant_xp(state: &mut UserState, amount: u32, source: XpSource, description: &str) {
    if amount == 0 {
        return;
    }

    state.xp += amount as u64;
    state.coins += (amount / 10) as u64;
    state.xp_events.push(XpEvent {
        ts: utc_timestamp_seconds(),
        source: source.as_str().to_string(),
        amount: amount as i64,
        description: description.to_string(),
    });
    mark_active_day(state, today_utc());
}

/// Store a test/scenario attempt and award XP from the percentage score.
///
/// The linear reward (2 XP per percent, max 200) is a compatibility
/// contract; scores recorded elsewhere must match it exactly. `time_sec`
/// is recorded as given.
pub fn record_test_attempt(
    state: &mut UserState,
    test_id: &str,
    name: &str,
    subject: &str,
    correct: i64,
    total: i64,
    time_sec: i64,
) -> TestAttempt {
    let total = total.max(1) as u32;
    let correct = correct.clamp(0, total as i64) as u32;

    let percent = ((correct as f64 / total as f64) * 100.0 * 10.0).round() / 10.0;
    let xp_gain = (percent * 2.0) as u32;

    grant_xp(state, xp_gain, XpSource::Test, &format!("{} ({})", name, subject));

    let attempt = TestAttempt {
        timestamp: utc_timestamp_seconds(),
        test_id: test_id.to_string(),
        name: name.to_string(),
        subject: subject.to_string(),
        correct,
        total,
        percent,
        time_sec,
        xp_gained: xp_gain,
    };
    state.test_history.push(attempt.clone());
    state.tests_taken += 1;
    mark_active_day(state, today_utc());

    attempt
}

/// Overwrite profile identity fields. Empty values never clear a field.
pub fn set_user_profile(state: &mut UserState, username: &str, email: Option<&str>) {
    if !username.is_empty() {
        state.username = username.to_string();
    }
    if let Some(email) = email {
        if !email.is_empty() {
            state.email = Some(email.to_string());
        }
    }
    mark_active_day(state, today_utc());
}

/// One Simulation Lab pulse: grant XP and shift the token balance.
pub fn apply_simulation_pulse(state: &mut UserState, scenario: &str, xp_gain: u32, token_delta: f64) {
    let note = format!("{} pulse: +{} XP | token delta {:+.2}", scenario, xp_gain, token_delta);
    grant_xp(state, xp_gain, XpSource::Simulation, &note);
    state.token_balance = round2(state.token_balance + token_delta);
    mark_active_day(state, today_utc());
}

/// The scenario/test a session is currently working on.
///
/// Session-scoped: never persisted with the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentScenario {
    pub test_id: String,
    pub name: String,
    pub subject: String,
}
