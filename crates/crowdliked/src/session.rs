//! Session host - owns the live profile objects.
//!
//! One live `UserState` per identity, loaded and merged once, mutated only
//! through the mutation API, and written back at session boundaries. The
//! anonymous identity never touches storage. Access is serialized through
//! one async mutex, so mutations are never observed half-applied.

use crowdlike_common::auth::{
    has_password, set_password_fields, validate_new_password, verify_password,
};
use crowdlike_common::identity::{is_anonymous, resolve_identity};
use crowdlike_common::mutations::{grant_xp, set_user_profile, CurrentScenario, XpSource};
use crowdlike_common::storage::{merge_state, ProfileStore};
use crowdlike_common::UserState;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

/// Credentials and profile hints for one login attempt.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm: Option<String>,
}

/// What a login attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Signed in; the live session now holds the merged profile.
    Success {
        user_id: String,
        new_account: bool,
    },
    /// No usable identity was supplied.
    MissingUsername,
    /// The account has a password and none was supplied.
    PasswordRequired,
    /// The supplied password did not verify.
    WrongPassword,
    /// Creating a password failed validation (mismatch or too short).
    PasswordRejected { reason: String },
}

struct SessionEntry {
    state: UserState,
    scenario: Option<CurrentScenario>,
}

/// Holds the live state objects and their backing store.
pub struct SessionManager {
    store: ProfileStore,
    live: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionManager {
    pub fn new(store: ProfileStore) -> Self {
        Self {
            store,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Run `f` against the live state for `user_id`, persisting afterwards.
    ///
    /// The state is loaded and merged on first touch. Anonymous sessions
    /// get a live object too, but are never written back.
    pub async fn with_session<T>(&self, user_id: &str, f: impl FnOnce(&mut UserState) -> T) -> T {
        let mut live = self.live.lock().await;
        let entry = live.entry(user_id.to_string()).or_insert_with(|| SessionEntry {
            state: self.store.load_merged(user_id),
            scenario: None,
        });
        let result = f(&mut entry.state);
        if !is_anonymous(user_id) {
            self.store.save_user_state(user_id, &entry.state);
        }
        result
    }

    /// Read-only snapshot of a profile; never creates a file.
    pub async fn snapshot(&self, user_id: &str) -> UserState {
        let live = self.live.lock().await;
        match live.get(user_id) {
            Some(entry) => entry.state.clone(),
            None => self.store.load_merged(user_id),
        }
    }

    /// Remember which scenario this session is working on (not persisted).
    pub async fn set_scenario(&self, user_id: &str, scenario: CurrentScenario) {
        let mut live = self.live.lock().await;
        let entry = live.entry(user_id.to_string()).or_insert_with(|| SessionEntry {
            state: self.store.load_merged(user_id),
            scenario: None,
        });
        crowdlike_common::mutations::mark_active_day(
            &mut entry.state,
            crowdlike_common::mutations::today_utc(),
        );
        entry.scenario = Some(scenario);
        if !is_anonymous(user_id) {
            self.store.save_user_state(user_id, &entry.state);
        }
    }

    /// Current scenario for a session, if one was selected.
    pub async fn current_scenario(&self, user_id: &str) -> Option<CurrentScenario> {
        let live = self.live.lock().await;
        live.get(user_id).and_then(|entry| entry.scenario.clone())
    }

    /// Demo sign-in with optional password creation.
    ///
    /// Existing accounts with a password must verify it. Accounts without
    /// one may set it here (validated, then saved immediately so the hash
    /// survives a crash). Truly new accounts get a one-time welcome bonus.
    pub async fn login(&self, request: LoginRequest) -> LoginOutcome {
        let user_id = resolve_identity(request.email.as_deref(), &request.username);
        if is_anonymous(&user_id) {
            return LoginOutcome::MissingUsername;
        }

        let saved = self.store.load_user_state(&user_id);
        let new_account = saved.is_none();
        let mut merged = match saved {
            Some(map) => merge_state(&UserState::default(), map),
            None => UserState::default(),
        };

        if has_password(&merged) {
            let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) else {
                return LoginOutcome::PasswordRequired;
            };
            if !verify_password(&merged, password) {
                return LoginOutcome::WrongPassword;
            }
        } else {
            let wants_password = request.password.as_deref().is_some_and(|p| !p.is_empty())
                || request.confirm.as_deref().is_some_and(|p| !p.is_empty());
            if wants_password {
                let password = request.password.as_deref().unwrap_or("");
                let confirm = request.confirm.as_deref().unwrap_or("");
                if let Err(e) = validate_new_password(password, confirm) {
                    return LoginOutcome::PasswordRejected {
                        reason: e.to_string(),
                    };
                }
                set_password_fields(&mut merged, password);
            }
        }

        set_user_profile(&mut merged, request.username.trim(), request.email.as_deref());
        if new_account {
            grant_xp(&mut merged, 10, XpSource::Login, "Welcome bonus");
            info!("New account created for {}", user_id);
        }

        // Save right away so the password and welcome bonus are durable.
        self.store.save_user_state(&user_id, &merged);
        let mut live = self.live.lock().await;
        live.insert(
            user_id.clone(),
            SessionEntry {
                state: merged,
                scenario: None,
            },
        );

        LoginOutcome::Success { user_id, new_account }
    }

    /// Replace an account with a fresh default profile.
    ///
    /// Only the username is carried forward; XP, history, and the password
    /// are all gone afterwards.
    pub async fn reset_account(&self, username: &str) -> String {
        let user_id = resolve_identity(None, username);
        let fresh = UserState::fresh_for(username.trim());
        if !is_anonymous(&user_id) {
            self.store.save_user_state(&user_id, &fresh);
        }
        let mut live = self.live.lock().await;
        live.insert(
            user_id.clone(),
            SessionEntry {
                state: fresh,
                scenario: None,
            },
        );
        info!("Account reset for {}", user_id);
        user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowdlike_common::identity::ANONYMOUS;
    use tempfile::TempDir;

    fn manager() -> (SessionManager, TempDir) {
        let dir = TempDir::new().unwrap();
        (SessionManager::new(ProfileStore::new(dir.path())), dir)
    }

    fn login_req(username: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_account_gets_welcome_bonus_once() {
        let (manager, _dir) = manager();

        let outcome = manager.login(login_req("Miguel")).await;
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                user_id: "miguel".to_string(),
                new_account: true
            }
        );

        let state = manager.snapshot("miguel").await;
        assert_eq!(state.xp, 10);
        assert_eq!(state.username, "Miguel");
        assert_eq!(state.xp_events.len(), 1);
        assert_eq!(state.xp_events[0].source, "Login");

        // Logging in again is not "new" and grants nothing.
        let outcome = manager.login(login_req("Miguel")).await;
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                user_id: "miguel".to_string(),
                new_account: false
            }
        );
        let state = manager.snapshot("miguel").await;
        assert_eq!(state.xp, 10);
    }

    #[tokio::test]
    async fn test_missing_username_is_rejected() {
        let (manager, _dir) = manager();
        assert_eq!(manager.login(login_req("   ")).await, LoginOutcome::MissingUsername);
    }

    #[tokio::test]
    async fn test_password_setting_and_verification() {
        let (manager, _dir) = manager();

        let mut request = login_req("Ana");
        request.password = Some("abcd".to_string());
        request.confirm = Some("abcd".to_string());
        let outcome = manager.login(request).await;
        assert!(matches!(outcome, LoginOutcome::Success { .. }));

        // Password is now required.
        assert_eq!(manager.login(login_req("Ana")).await, LoginOutcome::PasswordRequired);

        let mut request = login_req("Ana");
        request.password = Some("wrong".to_string());
        assert_eq!(manager.login(request).await, LoginOutcome::WrongPassword);

        let mut request = login_req("Ana");
        request.password = Some("abcd".to_string());
        let outcome = manager.login(request).await;
        assert_eq!(
            outcome,
            LoginOutcome::Success {
                user_id: "ana".to_string(),
                new_account: false
            }
        );
    }

    #[tokio::test]
    async fn test_password_validation_errors() {
        let (manager, _dir) = manager();

        let mut request = login_req("Ana");
        request.password = Some("abcd".to_string());
        request.confirm = Some("abce".to_string());
        let outcome = manager.login(request).await;
        assert_eq!(
            outcome,
            LoginOutcome::PasswordRejected {
                reason: "Passwords do not match.".to_string()
            }
        );

        let mut request = login_req("Ana");
        request.password = Some("abc".to_string());
        request.confirm = Some("abc".to_string());
        let outcome = manager.login(request).await;
        assert!(matches!(outcome, LoginOutcome::PasswordRejected { .. }));

        // Nothing was persisted by the failed attempts.
        assert!(manager.store().load_user_state("ana").is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_state_untouched() {
        let (manager, _dir) = manager();

        let mut request = login_req("Ana");
        request.password = Some("abcd".to_string());
        request.confirm = Some("abcd".to_string());
        manager.login(request).await;
        let before = manager.snapshot("ana").await;

        let mut request = login_req("Ana");
        request.password = Some("nope".to_string());
        manager.login(request).await;
        assert_eq!(manager.snapshot("ana").await, before);
    }

    #[tokio::test]
    async fn test_anonymous_sessions_never_write_files() {
        let (manager, _dir) = manager();

        manager
            .with_session(ANONYMOUS, |state| {
                grant_xp(state, 50, XpSource::Simulation, "drive-by");
            })
            .await;

        // The live object mutated, but no file appeared.
        let state = manager.snapshot(ANONYMOUS).await;
        assert_eq!(state.xp, 50);
        assert!(!manager.store().path_for(ANONYMOUS).exists());
    }

    #[tokio::test]
    async fn test_with_session_persists_named_users() {
        let (manager, _dir) = manager();
        manager.login(login_req("Miguel")).await;

        manager
            .with_session("miguel", |state| {
                grant_xp(state, 100, XpSource::Simulation, "run");
            })
            .await;

        // A second manager over the same directory sees the write.
        let other = SessionManager::new(ProfileStore::new(manager.store().data_dir()));
        let state = other.snapshot("miguel").await;
        assert_eq!(state.xp, 110);
    }

    #[tokio::test]
    async fn test_reset_carries_username_only() {
        let (manager, _dir) = manager();

        let mut request = login_req("Miguel");
        request.password = Some("abcd".to_string());
        request.confirm = Some("abcd".to_string());
        manager.login(request).await;
        manager
            .with_session("miguel", |state| {
                grant_xp(state, 500, XpSource::Simulation, "run");
            })
            .await;

        manager.reset_account("Miguel").await;
        let state = manager.snapshot("miguel").await;
        assert_eq!(state.username, "Miguel");
        assert_eq!(state.xp, 0);
        assert!(state.xp_events.is_empty());
        assert!(!has_password(&state));
    }

    #[tokio::test]
    async fn test_scenario_is_session_scoped() {
        let (manager, _dir) = manager();
        manager.login(login_req("Miguel")).await;

        manager
            .set_scenario(
                "miguel",
                CurrentScenario {
                    test_id: "alg1_quiz".to_string(),
                    name: "Fractions".to_string(),
                    subject: "Algebra".to_string(),
                },
            )
            .await;

        assert_eq!(
            manager.current_scenario("miguel").await.unwrap().test_id,
            "alg1_quiz"
        );

        // The scenario selection marked the day active on the profile...
        let state = manager.snapshot("miguel").await;
        assert_eq!(state.days_active.len(), 1);

        // ...but never landed in the profile file.
        let raw = std::fs::read_to_string(manager.store().path_for("miguel")).unwrap();
        assert!(!raw.contains("alg1_quiz"));
    }
}
