//! Identity resolution and file-safe user ids.
//!
//! A profile is keyed by a normalized identifier: verified email when
//! available, else the demo username, else the anonymous sentinel. The
//! anonymous identity is never persisted or loaded.

/// Sentinel for sessions without a usable identity.
pub const ANONYMOUS: &str = "anonymous";

/// Normalize the persistence key for a user.
pub fn resolve_identity(email: Option<&str>, username: &str) -> String {
    let email = email.map(str::trim).unwrap_or("");
    if !email.is_empty() {
        return email.to_lowercase();
    }
    let username = username.trim();
    if !username.is_empty() {
        return username.to_lowercase();
    }
    ANONYMOUS.to_string()
}

/// True when an id must never touch storage.
pub fn is_anonymous(user_id: &str) -> bool {
    user_id == ANONYMOUS
}

/// Reduce an identity to a filename-safe form.
///
/// Keeps alphanumerics and `-_.@`; anything else is dropped. An id that
/// sanitizes to nothing falls back to the anonymous sentinel.
pub fn safe_file_id(user_id: &str) -> String {
    let safe: String = user_id
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        .collect();
    if safe.is_empty() {
        ANONYMOUS.to_string()
    } else {
        safe
    }
}
