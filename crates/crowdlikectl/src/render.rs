//! Terminal rendering for profile inspection.

use chrono::NaiveDate;
use console::style;
use crowdlike_common::achievements::achievements_catalog;
use crowdlike_common::progression::{
    compute_best_streak, compute_streak, subject_xp_breakdown, xp_progress,
};
use crowdlike_common::UserState;
use owo_colors::OwoColorize;

/// ASCII progress bar, `width` cells wide.
pub fn xp_bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

/// Profile header card: identity, level, currencies, streaks.
pub fn print_profile(state: &UserState, today: NaiveDate) {
    let progress = xp_progress(state.xp);
    let streak = compute_streak(&state.days_active, today);
    let best = compute_best_streak(&state.days_active);

    println!();
    println!("  {}", style(&state.username).bold());
    if let Some(email) = &state.email {
        println!("  {}", style(email).dim());
    }
    println!();
    println!(
        "  Level {}  {}  {}/{} XP",
        progress.level,
        xp_bar(progress.fraction, 20),
        progress.xp_into_level,
        progress.xp_needed
    );
    println!(
        "  XP {}  Coins {}  Gems {}  Tokens {:.2}",
        state.xp, state.coins, state.gems, state.token_balance
    );
    println!(
        "  Streak {} day(s)  Best {}  Scenarios {}",
        streak, best, state.tests_taken
    );

    let subjects = subject_xp_breakdown(&state.test_history);
    if !subjects.is_empty() {
        println!();
        println!("  {}", style("Behavior channels").bold());
        for (subject, stats) in &subjects {
            println!("    {:<24} {:>6} XP  {} run(s)", subject, stats.xp, stats.tests);
        }
    }
    println!();
}

/// Achievement list, catalog order, unlocked entries highlighted.
pub fn print_achievements(state: &UserState, today: NaiveDate) {
    println!();
    println!("  {}", style("Achievements").bold());
    for achievement in achievements_catalog(state, today) {
        if achievement.unlocked {
            println!(
                "  {} {:<26} {}",
                "[x]".green(),
                achievement.name.green(),
                achievement.progress
            );
        } else {
            println!(
                "  [ ] {:<26} {}",
                achievement.name,
                style(&achievement.progress).dim()
            );
        }
    }
    println!();
}

/// Most recent test attempts, newest first.
pub fn print_history(state: &UserState, limit: usize) {
    println!();
    println!("  {}", style("Recent scenario runs").bold());
    if state.test_history.is_empty() {
        println!("  {}", style("No attempts recorded yet.").dim());
        println!();
        return;
    }
    for attempt in state.test_history.iter().rev().take(limit) {
        println!(
            "  {}  {:<22} {:<18} {:>3}/{:<3} {:>5.1}%  +{} XP",
            style(&attempt.timestamp).dim(),
            attempt.name,
            attempt.subject,
            attempt.correct,
            attempt.total,
            attempt.percent,
            attempt.xp_gained
        );
    }
    println!();
}

/// Most recent token trades, newest first.
pub fn print_trades(state: &UserState, limit: usize) {
    println!();
    println!("  {}", style("Token trades").bold());
    if state.token_trades.is_empty() {
        println!("  {}", style("No trades logged yet.").dim());
        println!();
        return;
    }
    for trade in state.token_trades.iter().rev().take(limit) {
        let action = match trade.action {
            crowdlike_common::TradeAction::Buy => "buy ".green().to_string(),
            crowdlike_common::TradeAction::Sell => "sell".red().to_string(),
        };
        println!(
            "  {}  {}  {:>8.2} @ {:>8.2}  coins {:+}  tokens {:+.2}",
            style(&trade.timestamp).dim(),
            action,
            trade.amount,
            trade.price,
            trade.coin_delta,
            trade.token_delta
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_bar_fill() {
        assert_eq!(xp_bar(0.0, 10), "[..........]");
        assert_eq!(xp_bar(0.5, 10), "[#####.....]");
        assert_eq!(xp_bar(1.0, 10), "[##########]");
        // Out-of-range fractions clamp instead of panicking.
        assert_eq!(xp_bar(1.7, 10), "[##########]");
        assert_eq!(xp_bar(-0.2, 10), "[..........]");
    }
}
