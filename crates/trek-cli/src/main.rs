//! Trek CLI - track travel expenses from the terminal
//!
//! Works offline against the local cache and pushes queued changes with
//! `trek sync` once the remote store is reachable.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use trek_core::config::AppConfig;

use crate::cli::{Cli, Commands};
use crate::commands::category::run_category;
use crate::commands::common::{Session, SessionOptions};
use crate::commands::convert::run_convert;
use crate::commands::currency::run_currency;
use crate::commands::expense::run_expense;
use crate::commands::sync::run_sync;
use crate::commands::trip::run_trip;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "trek=info,trek_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let options = SessionOptions {
        offline: cli.offline,
        data_dir: cli.data_dir,
        user: cli.user,
        locale: cli.locale.into(),
        json: cli.json,
    };
    let session = Session::open(options, config).await?;

    match cli.command {
        Commands::Trip { command } => run_trip(&session, command).await?,
        Commands::Category { command } => run_category(&session, command).await?,
        Commands::Expense { command } => run_expense(&session, command).await?,
        Commands::Sync => run_sync(&session).await?,
        Commands::Convert { from, to, amount } => {
            run_convert(&session, &from, &to, amount).await?;
        }
        Commands::Currency { command } => run_currency(&session, command).await?,
    }

    Ok(())
}
