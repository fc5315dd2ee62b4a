//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Failsift: test-failure clustering and bug automation.
#[derive(Parser)]
#[command(name = "failsift", version, about)]
pub struct Cli {
    /// Path to a configuration file (defaults to .failsift/config.yaml
    /// plus FAILSIFT_* environment overrides).
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations.
    Init,
    /// Run one orchestrator tick (normally invoked by cron).
    Orchestrate(commands::orchestrate::OrchestrateArgs),
    /// Drain pending shard tasks.
    Worker(commands::worker::WorkerArgs),
    /// Run one bug-update pass over every project.
    UpdateBugs,
    /// Show reclustering run progress per project.
    Status,
}

/// Prints an error and exits nonzero.
pub fn handle_error(err: anyhow::Error) -> ! {
    tracing::error!(error = ?err, "command failed");
    eprintln!("error: {err:#}");
    std::process::exit(1);
}
