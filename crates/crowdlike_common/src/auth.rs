//! Password hashing for demo accounts.
//!
//! Profiles store only a salted PBKDF2-HMAC-SHA256 hash (hex salt, hex key,
//! round count). A partial triple is treated as "no password". Verification
//! never raises; anything malformed just fails the check.

use crate::state::UserState;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

/// Derivation rounds for newly set passwords.
pub const PBKDF2_ROUNDS: u32 = 200_000;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Rejection reasons when creating a password.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Passwords do not match.")]
    Mismatch,

    #[error("Password too short (min {MIN_PASSWORD_LEN}).")]
    TooShort,
}

fn derive_hash(password: &str, salt_hex: &str, rounds: u32) -> String {
    let salt = hex::decode(salt_hex).unwrap_or_default();
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut key);
    hex::encode(key)
}

/// Check a new password before hashing it.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), PasswordError> {
    if password != confirm {
        return Err(PasswordError::Mismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

/// Set the password triple on a profile. Only the salted hash is stored.
pub fn set_password_fields(state: &mut UserState, password: &str) {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);

    state.auth_pw_hash = Some(derive_hash(password, &salt_hex, PBKDF2_ROUNDS));
    state.auth_pw_salt = Some(salt_hex);
    state.auth_pw_rounds = Some(PBKDF2_ROUNDS);
}

/// True when the profile carries a usable password.
pub fn has_password(state: &UserState) -> bool {
    let salt_set = state.auth_pw_salt.as_deref().is_some_and(|s| !s.is_empty());
    let hash_set = state.auth_pw_hash.as_deref().is_some_and(|s| !s.is_empty());
    salt_set && hash_set
}

/// Recompute the derivation and compare. False on any missing field.
pub fn verify_password(state: &UserState, password: &str) -> bool {
    let (Some(salt), Some(hash)) = (state.auth_pw_salt.as_deref(), state.auth_pw_hash.as_deref())
    else {
        return false;
    };
    if salt.is_empty() || hash.is_empty() {
        return false;
    }
    let rounds = state.auth_pw_rounds.filter(|r| *r > 0).unwrap_or(PBKDF2_ROUNDS);
    derive_hash(password, salt, rounds) == hash
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full-strength derivation is slow in debug builds; exercise the
    // round-trip through the same code path with the stored round count.
    fn set_password_fast(state: &mut UserState, password: &str) {
        set_password_fields(state, password);
        let salt = state.auth_pw_salt.clone().unwrap();
        state.auth_pw_rounds = Some(1_000);
        state.auth_pw_hash = Some(derive_hash(password, &salt, 1_000));
    }

    #[test]
    fn test_password_roundtrip() {
        let mut state = UserState::default();
        set_password_fast(&mut state, "hunter2");

        assert!(has_password(&state));
        assert!(verify_password(&state, "hunter2"));
        assert!(!verify_password(&state, "hunter2x"));
        assert!(!verify_password(&state, ""));
    }

    #[test]
    fn test_set_password_fields_shape() {
        let mut state = UserState::default();
        set_password_fields(&mut state, "abcd");

        assert_eq!(state.auth_pw_salt.as_ref().unwrap().len(), SALT_LEN * 2);
        assert_eq!(state.auth_pw_hash.as_ref().unwrap().len(), KEY_LEN * 2);
        assert_eq!(state.auth_pw_rounds, Some(PBKDF2_ROUNDS));
    }

    #[test]
    fn test_partial_triple_means_no_password() {
        let mut state = UserState::default();
        assert!(!has_password(&state));
        assert!(!verify_password(&state, "anything"));

        state.auth_pw_salt = Some("aabb".to_string());
        assert!(!has_password(&state));
        assert!(!verify_password(&state, "anything"));

        state.auth_pw_salt = None;
        state.auth_pw_hash = Some("ccdd".to_string());
        assert!(!has_password(&state));
        assert!(!verify_password(&state, "anything"));
    }

    #[test]
    fn test_empty_fields_mean_no_password() {
        let mut state = UserState::default();
        state.auth_pw_salt = Some(String::new());
        state.auth_pw_hash = Some(String::new());
        assert!(!has_password(&state));
        assert!(!verify_password(&state, "anything"));
    }

    #[test]
    fn test_missing_rounds_defaults() {
        let mut state = UserState::default();
        set_password_fields(&mut state, "abcd");
        state.auth_pw_rounds = None;
        // Default round count matches what set_password_fields used.
        assert!(verify_password(&state, "abcd"));
    }

    #[test]
    fn test_validate_new_password() {
        assert_eq!(validate_new_password("abcd", "abcd"), Ok(()));
        assert_eq!(
            validate_new_password("abcd", "abce"),
            Err(PasswordError::Mismatch)
        );
        assert_eq!(validate_new_password("abc", "abc"), Err(PasswordError::TooShort));
    }

    #[test]
    fn test_salts_are_unique() {
        let mut a = UserState::default();
        let mut b = UserState::default();
        set_password_fields(&mut a, "abcd");
        set_password_fields(&mut b, "abcd");
        assert_ne!(a.auth_pw_salt, b.auth_pw_salt);
        assert_ne!(a.auth_pw_hash, b.auth_pw_hash);
    }
}
