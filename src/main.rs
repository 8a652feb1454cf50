//! Caissa CLI entry point.

use anyhow::Context;
use clap::Parser;

use caissa::cli::{commands, handle_error, Cli, Commands};
use caissa::infrastructure::config::ConfigLoader;
use caissa::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load_with(cli.config.as_deref()).context("Failed to load configuration") {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, cli.json).await,
        Commands::Ingest(args) => commands::ingest::execute(args, &config, cli.json).await,
        Commands::Plan(args) => commands::plan::execute(args, &config, cli.json).await,
        Commands::Audit(args) => commands::audit::execute(args, &config, cli.json).await,
        Commands::Weakness(args) => commands::weakness::execute(args, &config, cli.json).await,
        Commands::Reflect(args) => commands::reflect::execute(args, &config, cli.json).await,
        Commands::History(args) => commands::history::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
