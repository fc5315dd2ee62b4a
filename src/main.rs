//! Failsift CLI entry point.

use clap::Parser;

use failsift::cli::{handle_error, Cli, Commands};
use failsift::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Use the configured logging settings when the config loads; a
    // broken config falls back to defaults so the load error itself is
    // still reported through the command below.
    let logging_config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .map(|config| config.logging)
    .unwrap_or_default();
    logging::init(&logging_config);

    let result = match cli.command {
        Commands::Init => failsift::cli::commands::init::execute(config_path).await,
        Commands::Orchestrate(args) => {
            failsift::cli::commands::orchestrate::execute(args, config_path).await
        }
        Commands::Worker(args) => failsift::cli::commands::worker::execute(args, config_path).await,
        Commands::UpdateBugs => failsift::cli::commands::update_bugs::execute(config_path).await,
        Commands::Status => failsift::cli::commands::status::execute(config_path).await,
    };

    if let Err(err) = result {
        handle_error(err);
    }
}
