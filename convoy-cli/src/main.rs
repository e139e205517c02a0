//! Convoy CLI
//!
//! Command-line interface for the Convoy orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Deploy multi-container applications across Docker hosts", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "CONVOY_URL", default_value = "http://localhost:8080")]
    orchestrator_url: String,

    /// Identity sent to the orchestrator
    #[arg(long, env = "CONVOY_USER")]
    user: String,

    /// Header carrying the identity
    #[arg(long, env = "CONVOY_USER_HEADER", default_value = convoy_client::DEFAULT_USER_HEADER)]
    user_header: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        user: cli.user,
        user_header: cli.user_header,
    };

    handle_command(cli.command, &config).await
}
