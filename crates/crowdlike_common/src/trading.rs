//! Token trading desk - balance checks, adjustment, and the trade log.
//!
//! `log_token_trade` is a pure append; `buy_tokens`/`sell_tokens` validate
//! against the current balances, adjust them, and then log. A rejected
//! trade leaves the state untouched and surfaces a human-readable warning.

use crate::mutations::{mark_active_day, round2, today_utc};
use crate::state::{TokenTrade, TradeAction, UserState, utc_timestamp_seconds};
use thiserror::Error;

/// Trade rejection reasons. Messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("Invalid amount.")]
    InvalidAmount,

    #[error("Not enough coins: need {cost}, have {coins}.")]
    InsufficientCoins { cost: i64, coins: u64 },

    #[error("Not enough tokens: need {amount:.2}, have {balance:.2}.")]
    InsufficientTokens { amount: f64, balance: f64 },
}

/// Append a trade record. Does not touch balances.
pub fn log_token_trade(
    state: &mut UserState,
    action: TradeAction,
    amount: f64,
    price: f64,
    coin_delta: i64,
    token_delta: f64,
) -> TokenTrade {
    let trade = TokenTrade {
        timestamp: utc_timestamp_seconds(),
        action,
        amount: round2(amount),
        price: round2(price),
        coin_delta,
        token_delta: round2(token_delta),
    };
    state.token_trades.push(trade.clone());
    trade
}

/// Buy tokens with coins. Cost is truncated to whole coins.
pub fn buy_tokens(state: &mut UserState, amount: f64, price: f64) -> Result<TokenTrade, TradeError> {
    if amount <= 0.0 {
        return Err(TradeError::InvalidAmount);
    }
    let cost = amount * price;
    if cost > state.coins as f64 {
        return Err(TradeError::InsufficientCoins {
            cost: cost as i64,
            coins: state.coins,
        });
    }

    let cost_coins = cost as i64;
    state.coins -= cost_coins as u64;
    state.token_balance = round2(state.token_balance + amount);
    let trade = log_token_trade(state, TradeAction::Buy, amount, price, -cost_coins, amount);
    mark_active_day(state, today_utc());
    Ok(trade)
}

/// Sell tokens for coins. Proceeds are truncated to whole coins.
pub fn sell_tokens(state: &mut UserState, amount: f64, price: f64) -> Result<TokenTrade, TradeError> {
    if amount <= 0.0 {
        return Err(TradeError::InvalidAmount);
    }
    if amount > state.token_balance {
        return Err(TradeError::InsufficientTokens {
            amount,
            balance: state.token_balance,
        });
    }

    let proceeds = (amount * price) as i64;
    state.coins += proceeds as u64;
    state.token_balance = round2(state.token_balance - amount);
    let trade = log_token_trade(state, TradeAction::Sell, amount, price, proceeds, -amount);
    mark_active_day(state, today_utc());
    Ok(trade)
}
