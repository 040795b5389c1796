//! Daemon-side session lifecycle against a real profile directory.

use chrono::NaiveDate;
use crowdlike_common::mutations::record_test_attempt;
use crowdlike_common::storage::ProfileStore;
use crowdlike_common::trading::buy_tokens;
use crowdliked::routes::ProfileView;
use crowdliked::session::{LoginRequest, LoginOutcome, SessionManager};
use tempfile::TempDir;

fn login(username: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(ProfileStore::new(dir.path()));

    let outcome = manager.login(login("Miguel")).await;
    assert!(matches!(outcome, LoginOutcome::Success { new_account: true, .. }));

    // A study session: two attempts and a token buy.
    manager
        .with_session("miguel", |profile| {
            record_test_attempt(profile, "alg1_quiz", "Fractions", "Algebra", 7, 10, 95);
            record_test_attempt(profile, "phys_intro", "Motion", "Physics", 10, 10, 120);
        })
        .await;
    manager
        .with_session("miguel", |profile| {
            buy_tokens(profile, 1.0, 30.0).unwrap();
        })
        .await;

    // 10 (welcome) + 140 + 200 XP; 1 + 14 + 20 coins, minus 30 for the buy.
    let state = manager.snapshot("miguel").await;
    assert_eq!(state.xp, 350);
    assert_eq!(state.coins, 5);
    assert_eq!(state.tests_taken, 2);
    assert_eq!(state.token_balance, 1.0);

    // A fresh manager over the same directory sees the persisted session.
    let restarted = SessionManager::new(ProfileStore::new(dir.path()));
    let reloaded = restarted.snapshot("miguel").await;
    assert_eq!(reloaded, state);
}

#[tokio::test]
async fn profile_view_derives_display_values() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(ProfileStore::new(dir.path()));
    manager.login(login("Ana")).await;

    manager
        .with_session("ana", |profile| {
            profile.xp = 2250;
            profile.days_active = vec![
                "2026-01-03".to_string(),
                "2026-01-04".to_string(),
                "2026-01-05".to_string(),
            ];
        })
        .await;

    let state = manager.snapshot("ana").await;
    let today = NaiveDate::parse_from_str("2026-01-05", "%Y-%m-%d").unwrap();
    let view = ProfileView::from_state(&state, today);

    assert_eq!(view.level, 3);
    assert_eq!(view.xp_into_level, 250);
    assert_eq!(view.xp_needed, 1000);
    assert_eq!(view.streak, 3);
    assert_eq!(view.best_streak, 3);
    assert_eq!(view.username, "Ana");
}
