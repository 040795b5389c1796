//! Progression engine - levels, streaks, and XP analytics.
//!
//! Every function here is a pure read over a state snapshot. The current
//! date is always an explicit parameter so results are deterministic and
//! the hosting layer decides when to recompute.

use crate::state::{TestAttempt, UserState, XpEvent};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashSet};

/// XP per level. Level boundaries are exact multiples of this.
pub const XP_PER_LEVEL: u64 = 1000;

/// Simple level curve: 1000 XP per level, level 1 spans [0, 1000).
pub fn level_from_xp(xp: u64) -> u32 {
    (xp / XP_PER_LEVEL) as u32 + 1
}

/// Position within the current level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpProgress {
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_needed: u64,
    /// Fill fraction for progress bars, clamped to [0, 1].
    pub fraction: f64,
}

pub fn xp_progress(xp: u64) -> XpProgress {
    let level = level_from_xp(xp);
    let base = (level as u64 - 1) * XP_PER_LEVEL;
    let xp_into_level = xp - base;
    let fraction = (xp_into_level as f64 / XP_PER_LEVEL as f64).clamp(0.0, 1.0);
    XpProgress {
        level,
        xp_into_level,
        xp_needed: XP_PER_LEVEL,
        fraction,
    }
}

fn parse_days(days_active: &[String]) -> Vec<NaiveDate> {
    // Entries that are not ISO dates are skipped, not fatal.
    days_active
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect()
}

/// Current streak: consecutive active days ending at `today` (inclusive).
///
/// Returns 0 when `today` itself is not active.
pub fn compute_streak(days_active: &[String], today: NaiveDate) -> u32 {
    if days_active.is_empty() {
        return 0;
    }

    let active: HashSet<NaiveDate> = parse_days(days_active).into_iter().collect();
    let mut streak = 0;
    let mut cursor = today;
    while active.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }
    streak
}

/// Longest run of consecutive active days anywhere in the history.
pub fn compute_best_streak(days_active: &[String]) -> u32 {
    let mut dates = parse_days(days_active);
    if dates.is_empty() {
        return 0;
    }
    dates.sort();
    dates.dedup();

    let mut best = 1;
    let mut current = 1;
    for window in dates.windows(2) {
        if window[1] == window[0] + Duration::days(1) {
            current += 1;
            best = best.max(current);
        } else {
            current = 1;
        }
    }
    best
}

/// Calendar date portion of an event timestamp.
///
/// Substring before the `T` separator, else the first 10 characters.
fn event_day(ts: &str) -> &str {
    match ts.find('T') {
        Some(idx) => &ts[..idx],
        None => &ts[..ts.len().min(10)],
    }
}

/// Total XP granted per calendar day.
pub fn xp_by_day(xp_events: &[XpEvent]) -> BTreeMap<String, i64> {
    let mut by_day = BTreeMap::new();
    for event in xp_events {
        *by_day.entry(event_day(&event.ts).to_string()).or_insert(0) += event.amount;
    }
    by_day
}

/// Label used when an attempt carries no subject.
pub const DEFAULT_SUBJECT: &str = "General behavior";

/// Per-subject XP totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SubjectStats {
    pub xp: u64,
    pub tests: u64,
}

/// Group test history into behavior channels by subject.
pub fn subject_xp_breakdown(test_history: &[TestAttempt]) -> BTreeMap<String, SubjectStats> {
    let mut breakdown: BTreeMap<String, SubjectStats> = BTreeMap::new();
    for attempt in test_history {
        let subject = if attempt.subject.is_empty() {
            DEFAULT_SUBJECT
        } else {
            attempt.subject.as_str()
        };
        let entry = breakdown.entry(subject.to_string()).or_default();
        entry.xp += attempt.xp_gained as u64;
        entry.tests += 1;
    }
    breakdown
}

/// Most recent attempt, if any.
pub fn last_test_attempt(state: &UserState) -> Option<&TestAttempt> {
    state.test_history.last()
}

/// Most recent attempt for a specific test.
pub fn last_attempt_for_test<'a>(state: &'a UserState, test_id: &str) -> Option<&'a TestAttempt> {
    state
        .test_history
        .iter()
        .rev()
        .find(|attempt| attempt.test_id == test_id)
}
