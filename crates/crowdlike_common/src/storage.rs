//! Profile storage - one JSON file per identity.
//!
//! Load fails soft (missing, unreadable, or non-object content all mean
//! "no data") and save is best-effort: a write failure is logged and
//! swallowed, never surfaced. Callers must not depend on a save landing.
//!
//! `merge_state` is a shallow merge: defaults first, then every loaded key
//! overwrites. Unknown keys survive for forward compatibility; known keys
//! with the wrong JSON type are reset to their default instead of failing
//! the load.

use crate::error::CoreError;
use crate::identity::safe_file_id;
use crate::state::{PricePoint, TestAttempt, TickPoint, TokenTrade, UserState, XpEvent};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default profile directory (`~/.local/share/crowdlike` on Linux).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("crowdlike"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/crowdlike"))
}

/// File-backed store of user profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    data_dir: PathBuf,
}

impl ProfileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Deterministic file path for an identity.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("user_{}.json", safe_file_id(user_id)))
    }

    /// Read a stored profile as a raw JSON object.
    ///
    /// `None` covers every failure: no file, unreadable file, bad JSON,
    /// or content that is not an object.
    pub fn load_user_state(&self, user_id: &str) -> Option<Map<String, Value>> {
        let raw = fs::read_to_string(self.path_for(user_id)).ok()?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Load and merge against defaults, or hand back defaults.
    pub fn load_merged(&self, user_id: &str) -> UserState {
        let defaults = UserState::default();
        match self.load_user_state(user_id) {
            Some(loaded) => merge_state(&defaults, loaded),
            None => defaults,
        }
    }

    /// Persist a profile. Failures are logged, not raised.
    pub fn save_user_state(&self, user_id: &str, state: &UserState) {
        if let Err(e) = self.try_save(user_id, state) {
            warn!("Failed to save profile for {}: {}", user_id, e);
        }
    }

    fn try_save(&self, user_id: &str, state: &UserState) -> Result<(), CoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let content = serde_json::to_string_pretty(state)?;
        fs::write(self.path_for(user_id), content)?;
        Ok(())
    }
}

/// Shallow merge of loaded data over schema defaults.
///
/// Loaded values replace defaults wholesale per key (nested structures are
/// not deep-merged). Wrong-typed known keys are self-healed to defaults
/// first; unknown keys pass through into the extras bag.
pub fn merge_state(defaults: &UserState, mut loaded: Map<String, Value>) -> UserState {
    sanitize_loaded(&mut loaded);

    let mut merged = match serde_json::to_value(defaults) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, value) in loaded {
        merged.insert(key, value);
    }

    match serde_json::from_value(Value::Object(merged)) {
        Ok(state) => state,
        Err(e) => {
            warn!("Stored profile did not match the schema after merge: {}", e);
            defaults.clone()
        }
    }
}

/// Drop or repair known keys whose JSON type does not match the schema.
fn sanitize_loaded(loaded: &mut Map<String, Value>) {
    retain_matching(loaded, "username", Value::is_string);
    retain_matching(loaded, "qubic_identity", Value::is_string);
    retain_matching(loaded, "email", |v| v.is_null() || v.is_string());
    retain_matching(loaded, "auth_pw_salt", |v| v.is_null() || v.is_string());
    retain_matching(loaded, "auth_pw_hash", |v| v.is_null() || v.is_string());
    retain_matching(loaded, "auth_pw_rounds", |v| v.is_null() || v.is_u64());

    for key in ["xp", "coins", "gems", "tests_taken"] {
        retain_matching(loaded, key, Value::is_u64);
    }
    retain_matching(loaded, "token_balance", Value::is_number);

    // Array-of-string field: keep only the string entries.
    match loaded.get("days_active") {
        Some(Value::Array(items)) => {
            let kept: Vec<Value> = items.iter().filter(|i| i.is_string()).cloned().collect();
            loaded.insert("days_active".to_string(), Value::Array(kept));
        }
        Some(_) => {
            loaded.remove("days_active");
        }
        None => {}
    }
    retain_matching(loaded, "ai_chat_history", Value::is_array);

    // Typed logs: salvage the entries that still parse.
    salvage_array::<TestAttempt>(loaded, "test_history");
    salvage_array::<XpEvent>(loaded, "xp_events");
    salvage_array::<TokenTrade>(loaded, "token_trades");
    salvage_array::<TickPoint>(loaded, "qubic_tick_history");
    salvage_array::<PricePoint>(loaded, "qubic_price_history");

    // Map of task lists: drop entries whose value is not a string list.
    match loaded.get("daily_tasks_done") {
        Some(Value::Object(entries)) => {
            let kept: Map<String, Value> = entries
                .iter()
                .filter(|(_, v)| serde_json::from_value::<Vec<String>>((*v).clone()).is_ok())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            loaded.insert("daily_tasks_done".to_string(), Value::Object(kept));
        }
        Some(_) => {
            loaded.remove("daily_tasks_done");
        }
        None => {}
    }
}

fn retain_matching(loaded: &mut Map<String, Value>, key: &str, ok: impl Fn(&Value) -> bool) {
    if loaded.get(key).map(|v| !ok(v)).unwrap_or(false) {
        loaded.remove(key);
    }
}

fn salvage_array<T: DeserializeOwned>(loaded: &mut Map<String, Value>, key: &str) {
    match loaded.get(key) {
        Some(Value::Array(items)) => {
            let kept: Vec<Value> = items
                .iter()
                .filter(|item| serde_json::from_value::<T>((*item).clone()).is_ok())
                .cloned()
                .collect();
            loaded.insert(key.to_string(), Value::Array(kept));
        }
        Some(_) => {
            loaded.remove(key);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (ProfileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (ProfileStore::new(dir.path()), dir)
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let (store, _dir) = store();
        assert!(store.load_user_state("nobody").is_none());
    }

    #[test]
    fn test_load_malformed_json_is_none() {
        let (store, _dir) = store();
        fs::write(store.path_for("miguel"), "{not json").unwrap();
        assert!(store.load_user_state("miguel").is_none());
    }

    #[test]
    fn test_load_non_object_is_none() {
        let (store, _dir) = store();
        fs::write(store.path_for("miguel"), "[1, 2, 3]").unwrap();
        assert!(store.load_user_state("miguel").is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (store, _dir) = store();
        let mut state = UserState::default();
        state.username = "Miguel".to_string();
        state.email = Some("miguel@example.com".to_string());
        state.xp = 2150;
        state.coins = 215;
        state.tests_taken = 2;
        state.days_active = vec!["2026-01-04".to_string(), "2026-01-05".to_string()];
        state.token_balance = 3.5;

        store.save_user_state("miguel@example.com", &state);
        let merged = store.load_merged("miguel@example.com");
        assert_eq!(merged, state);
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        // Data dir path occupied by a regular file: create_dir_all fails.
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "x").unwrap();
        let store = ProfileStore::new(&blocked);
        store.save_user_state("miguel", &UserState::default());
        assert!(store.load_user_state("miguel").is_none());
    }

    #[test]
    fn test_file_naming_is_sanitized() {
        let (store, _dir) = store();
        let path = store.path_for("Miguel/../x");
        assert!(path.to_string_lossy().ends_with("user_Miguel..x.json"));
        assert_eq!(store.path_for(""), store.data_dir().join("user_anonymous.json"));
    }

    #[test]
    fn test_merge_fills_missing_keys() {
        let defaults = UserState::default();
        let mut loaded = Map::new();
        loaded.insert("xp".to_string(), json!(500));

        let merged = merge_state(&defaults, loaded);
        assert_eq!(merged.xp, 500);
        assert_eq!(merged.coins, 0);
        assert_eq!(merged.username, "Login");
    }

    #[test]
    fn test_merge_preserves_unknown_keys() {
        let (store, _dir) = store();
        let defaults = UserState::default();
        let mut loaded = Map::new();
        loaded.insert("legacy_flag".to_string(), json!(true));
        loaded.insert("username".to_string(), json!("miguel"));

        let merged = merge_state(&defaults, loaded);
        assert_eq!(merged.extra["legacy_flag"], true);

        // The unknown key survives a save/load cycle too.
        store.save_user_state("miguel", &merged);
        let reloaded = store.load_merged("miguel");
        assert_eq!(reloaded.extra["legacy_flag"], true);
    }

    #[test]
    fn test_merge_self_heals_wrong_types() {
        let defaults = UserState::default();
        let mut loaded = Map::new();
        loaded.insert("xp".to_string(), json!("lots"));
        loaded.insert("ai_chat_history".to_string(), json!({"oops": 1}));
        loaded.insert("days_active".to_string(), json!(["2026-01-05", 7, null]));
        loaded.insert("coins".to_string(), json!(40));

        let merged = merge_state(&defaults, loaded);
        assert_eq!(merged.xp, 0);
        assert!(merged.ai_chat_history.is_empty());
        assert_eq!(merged.days_active, vec!["2026-01-05".to_string()]);
        assert_eq!(merged.coins, 40);
    }

    #[test]
    fn test_merge_salvages_valid_log_entries() {
        let defaults = UserState::default();
        let mut loaded = Map::new();
        loaded.insert(
            "xp_events".to_string(),
            json!([
                {"ts": "2026-01-05T10:00:00", "source": "Test", "amount": 140, "description": "ok"},
                "corrupted entry",
                42
            ]),
        );

        let merged = merge_state(&defaults, loaded);
        assert_eq!(merged.xp_events.len(), 1);
        assert_eq!(merged.xp_events[0].amount, 140);
    }

    #[test]
    fn test_merge_replaces_nested_structures_wholesale() {
        // Shallow merge: the loaded map replaces the default map entirely.
        let mut defaults = UserState::default();
        defaults
            .daily_tasks_done
            .insert("2026-01-01".to_string(), vec!["warmup".to_string()]);

        let mut loaded = Map::new();
        loaded.insert(
            "daily_tasks_done".to_string(),
            json!({"2026-01-05": ["review"]}),
        );

        let merged = merge_state(&defaults, loaded);
        assert!(!merged.daily_tasks_done.contains_key("2026-01-01"));
        assert_eq!(merged.daily_tasks_done["2026-01-05"], vec!["review".to_string()]);
    }

    #[test]
    fn test_stored_file_is_pretty_json() {
        let (store, _dir) = store();
        store.save_user_state("miguel", &UserState::default());
        let raw = fs::read_to_string(store.path_for("miguel")).unwrap();
        assert!(raw.starts_with("{\n  \"username\""));
    }
}
