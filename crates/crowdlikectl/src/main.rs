//! Crowdlike Control - CLI client for saved behavior profiles.
//!
//! Reads profile files directly; the daemon does not need to be running.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use crowdlike_common::identity::resolve_identity;
use crowdlike_common::storage::{default_data_dir, ProfileStore};
use crowdlikectl::render;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crowdlikectl")]
#[command(about = "Crowdlike - behavioral feedback profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Profile directory (defaults to the daemon's data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a profile summary with level and streaks
    Profile {
        /// Username or email the profile was saved under
        user: String,
    },

    /// List the achievement catalog with unlock progress
    Achievements {
        user: String,
    },

    /// Show recent scenario runs
    History {
        user: String,

        /// How many attempts to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the token trade log
    Trades {
        user: String,

        /// How many trades to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = ProfileStore::new(cli.data_dir.unwrap_or_else(default_data_dir));
    let today = Utc::now().date_naive();

    let user = match &cli.command {
        Commands::Profile { user }
        | Commands::Achievements { user }
        | Commands::History { user, .. }
        | Commands::Trades { user, .. } => user.clone(),
    };

    let user_id = resolve_identity(None, &user);
    if store.load_user_state(&user_id).is_none() {
        println!(
            "{}",
            style(format!("No saved profile for '{}'; showing defaults.", user)).yellow()
        );
    }
    let state = store.load_merged(&user_id);

    match cli.command {
        Commands::Profile { .. } => render::print_profile(&state, today),
        Commands::Achievements { .. } => render::print_achievements(&state, today),
        Commands::History { limit, .. } => render::print_history(&state, limit),
        Commands::Trades { limit, .. } => render::print_trades(&state, limit),
    }

    Ok(())
}
