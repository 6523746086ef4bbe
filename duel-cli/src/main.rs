mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use duel_core::{DuelError, GameGateway};
use duel_game::GameError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "duel")]
#[command(about = "Dice Duel - five dice against the computer")]
#[command(version)]
struct Cli {
    /// Data directory for the game database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip roll animations and turn pauses
    #[arg(long, global = true)]
    fast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play matches against the computer
    Play {
        /// Player name (prompted for when omitted)
        name: Option<String>,
        /// Seed the dice for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the top players
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show recently completed games
    Recent {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Show statistics for one player
    Stats {
        /// Player name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "duel={},duel_core={},duel_game={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let explicit_dir = cli.data_dir.is_some();
    let config = CliConfig::new(cli.data_dir, cli.verbose, cli.fast);

    // Without storage nothing else can run
    let gateway = match open_gateway(&config, explicit_dir).await {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_setup_error() {
                eprintln!("Check --data-dir or the DUEL_DB_PATH environment variable");
            }
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Play { name, seed } => {
            commands::play(Arc::clone(&gateway), name, seed, config.pacing()).await
        }
        Commands::Leaderboard { limit } => commands::show_leaderboard(&gateway, limit).await,
        Commands::Recent { limit } => commands::show_recent_games(&gateway, limit).await,
        Commands::Stats { name } => commands::show_player_stats(&gateway, &name).await,
    };

    if let Err(e) = result {
        let core_error = e.downcast_ref::<DuelError>().or_else(|| {
            match e.downcast_ref::<GameError>() {
                Some(GameError::DuelCore(inner)) => Some(inner),
                _ => None,
            }
        });

        match core_error {
            Some(DuelError::InvalidName(reason)) => {
                eprintln!("Error: Invalid player name: {}", reason);
            }
            Some(DuelError::PlayerNotFound { id }) => {
                eprintln!("Error: Player '{}' not found", id);
                eprintln!("Use 'duel leaderboard' to see known players");
            }
            _ => {
                eprintln!("Error: {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn open_gateway(config: &CliConfig, explicit_dir: bool) -> duel_core::Result<GameGateway> {
    let gateway_config = config.gateway_config(explicit_dir)?;
    tracing::debug!("Using database at {}", gateway_config.db_path.display());
    GameGateway::new(gateway_config).await
}
