//! Endorsement API server binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use endorsement_api::{config::Config, logging::init_logging, server};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "endorsement-api")]
#[command(version, about = "HTTP API for maritime service endorsements", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,

    /// Create the database and run migrations
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging, cli.debug)?;

    info!("Endorsement API starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("  Database: {}", config.database.url);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::run_with_config(config).await?,
        Commands::InitDb => server::init_database(&config).await?,
    }

    Ok(())
}
