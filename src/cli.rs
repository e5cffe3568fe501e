use clap::{Parser, Subcommand};

use crate::commands;
use crate::constants::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "gpwatch")]
#[command(about = "GPW fundamentals cache and forecast server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Refresh stale tickers and print the result
    Refresh,
    /// Show what the cache currently holds
    Status,
    /// Mark every cached row stale so the next read refetches
    ExpireCache,
    /// Check configuration and database health
    Doctor,
}

pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Refresh => {
            commands::refresh::run().await;
        }
        Commands::Status => {
            commands::status::run().await;
        }
        Commands::ExpireCache => {
            commands::expire::run().await;
        }
        Commands::Doctor => {
            commands::doctor::run().await;
        }
    }
}
