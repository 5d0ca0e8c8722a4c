//! Balances relay CLI
//!
//! Serves the latest VCU/DIEM balances snapshot over HTTP. An external updater pushes snapshots
//! with an authenticated write; anyone may read the latest one.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Balances relay: one authenticated writer, any number of anonymous readers.
#[derive(Parser)]
#[command(name = "balances")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the balances API and the viewer front-end
    Serve {
        #[command(flatten)]
        config: commands::ConfigArgs,
    },

    /// Validate configuration and print a redacted summary
    Check {
        #[command(flatten)]
        config: commands::ConfigArgs,
    },
}

fn main() -> Result<()> {
    // A `.env` file fills in variables before clap reads its env fallbacks. Real variables win.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    match cli.command {
        Commands::Serve { config } => commands::serve::run(config.load()?),
        Commands::Check { config } => commands::check::run(config.load()?),
    }
}
