//! dealwatch CLI — the main entry point.
//!
//! Commands:
//! - `watch`    — Monitor the market for one item until a deal is drafted
//! - `onboard`  — Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "dealwatch",
    about = "dealwatch — find a fairly priced second-hand listing and draft an inquiry",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the market for an item
    Watch(commands::watch::WatchArgs),

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Watch(args) => commands::watch::run(args).await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
