//! Achievement badges for the behavior progression system.
//!
//! The catalog is a fixed list evaluated in declaration order; display
//! surfaces must not re-sort it by unlock status. Every entry carries a
//! human-readable progress string alongside the unlocked flag.

use crate::progression::{compute_best_streak, xp_by_day};
use crate::state::UserState;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::HashSet;

/// One achievement with its current evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
    pub progress: String,
}

impl Achievement {
    fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        unlocked: bool,
        progress: String,
    ) -> Self {
        Self {
            id,
            name,
            description,
            unlocked,
            progress,
        }
    }
}

/// Evaluate the full catalog against a state snapshot.
pub fn achievements_catalog(state: &UserState, today: NaiveDate) -> Vec<Achievement> {
    let xp = state.xp;
    let tests = state.tests_taken;
    let best_streak = compute_best_streak(&state.days_active);
    let by_day = xp_by_day(&state.xp_events);

    let mut achievements = Vec::new();

    achievements.push(Achievement::new(
        "xp_1000",
        "First 1,000 Behavior XP",
        "Reach 1,000 XP from simulated behavior runs.",
        xp >= 1000,
        format!("{}/1000 XP", xp),
    ));
    achievements.push(Achievement::new(
        "xp_5000",
        "Serious Behavior Grinder",
        "Reach 5,000 XP in this session.",
        xp >= 5000,
        format!("{}/5000 XP", xp),
    ));

    achievements.push(Achievement::new(
        "tests_3",
        "Tried 3 Scenarios",
        "Record results for at least 3 scenarios.",
        tests >= 3,
        format!("{}/3 scenarios", tests),
    ));
    achievements.push(Achievement::new(
        "tests_10",
        "Scenario Explorer",
        "Record results for at least 10 scenarios.",
        tests >= 10,
        format!("{}/10 scenarios", tests),
    ));

    achievements.push(Achievement::new(
        "streak_3",
        "3-Day Discipline Streak",
        "Be active on 3 consecutive days.",
        best_streak >= 3,
        format!("Best streak: {}/3 days", best_streak),
    ));
    achievements.push(Achievement::new(
        "streak_7",
        "7-Day Commitment",
        "Be active on 7 consecutive days.",
        best_streak >= 7,
        format!("Best streak: {}/7 days", best_streak),
    ));

    // Any active Saturday immediately followed by an active Sunday.
    let active_dates: Vec<NaiveDate> = state
        .days_active
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect();
    let active_set: HashSet<NaiveDate> = active_dates.iter().copied().collect();
    let weekend_unlocked = active_dates
        .iter()
        .any(|d| d.weekday() == Weekday::Sat && active_set.contains(&(*d + Duration::days(1))));
    achievements.push(Achievement::new(
        "weekend_warrior",
        "Weekend Warrior",
        "Be active on both Saturday and Sunday (streak marker).",
        weekend_unlocked,
        if weekend_unlocked {
            "Seen Sat+Sun active day pair".to_string()
        } else {
            "No Sat+Sun pair yet".to_string()
        },
    ));

    // At least 5 of the last 7 calendar days (today inclusive) show activity:
    // either an active-day entry or nonzero XP for that date.
    let mut active_days_last7 = 0;
    for offset in 0..7 {
        let day = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
        let has_xp = by_day.get(&day).copied().unwrap_or(0) > 0;
        if has_xp || state.days_active.iter().any(|d| d == &day) {
            active_days_last7 += 1;
        }
    }
    achievements.push(Achievement::new(
        "momentum_builder",
        "Momentum Builder",
        "Gain XP on 5 out of the last 7 days.",
        active_days_last7 >= 5,
        format!("{}/5 active days in last 7", active_days_last7),
    ));

    achievements
}

/// Ids of currently unlocked achievements, catalog order.
pub fn unlocked_ids(state: &UserState, today: NaiveDate) -> Vec<&'static str> {
    achievements_catalog(state, today)
        .into_iter()
        .filter(|a| a.unlocked)
        .map(|a| a.id)
        .collect()
}
