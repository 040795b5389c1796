//! Crowdlike Common - shared state schema, progression, and persistence.
//!
//! Everything that both the daemon and the CLI need to agree on lives here:
//! the profile record, the mutation API that changes it, the pure
//! progression/achievement computations over it, and the file store that
//! round-trips it.

pub mod achievements;
pub mod auth;
pub mod error;
pub mod identity;
pub mod mutations;
pub mod progression;
pub mod state;
pub mod storage;
pub mod trading;

pub use error::CoreError;
pub use state::{TestAttempt, TokenTrade, TradeAction, UserState, XpEvent};
pub use storage::{ProfileStore, merge_state};
