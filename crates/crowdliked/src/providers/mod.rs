//! External read-only data providers.
//!
//! Both providers degrade failures (timeout, non-2xx, unexpected payload
//! shape) to an explicit [`FetchOutcome::Unavailable`] value; nothing here
//! ever propagates an error past the provider boundary. A failed fetch
//! simply yields "unavailable" for that render cycle and is retried on the
//! next invocation.

pub mod market;
pub mod qubic;

use serde_json::{Map, Value};

/// Result of one provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The parsed JSON payload.
    Payload(Value),
    /// Human-readable reason the data is missing this cycle.
    Unavailable { message: String },
}

impl FetchOutcome {
    pub fn unavailable(message: impl Into<String>) -> Self {
        FetchOutcome::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FetchOutcome::Unavailable { .. })
    }

    /// Payload as a JSON object, when present.
    pub fn object(&self) -> Option<&Map<String, Value>> {
        match self {
            FetchOutcome::Payload(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            FetchOutcome::Payload(value) => Some(value),
            FetchOutcome::Unavailable { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FetchOutcome::Unavailable { message } => Some(message),
            FetchOutcome::Payload(_) => None,
        }
    }
}

/// First candidate key that is present and non-empty.
///
/// Third-party payloads spell the same logical field several ways; callers
/// pass the candidates in preference order. Null values and empty strings
/// do not count as present.
pub fn pick_first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(value) = map.get(*key) {
            let empty = value.is_null() || value.as_str().map(str::is_empty).unwrap_or(false);
            if !empty {
                return Some(value);
            }
        }
    }
    None
}

/// Best-effort numeric coercion for loosely typed payload fields.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
