//! Folio CLI - keep a local portfolio content cache in sync from the terminal
//!
//! Runs reconciliation cycles against the content API, inspects the local
//! cache, and publishes documents as the admin.

mod auth;
mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::{run_login, run_logout};
use crate::commands::cache::run_cache;
use crate::commands::common::{load_client_config, resolve_cache_path};
use crate::commands::messages::run_messages;
use crate::commands::publish::run_publish;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    // `folio` covers both the CLI and folio-core targets.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("folio=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let cache_path = resolve_cache_path(cli.cache_path);
    tracing::debug!(cache = %cache_path.display(), "Resolved cache path");

    match cli.command {
        Commands::Sync { json } => {
            let config = load_client_config(cli.api_base_url)?;
            run_sync(&config, &cache_path, json).await
        }
        Commands::Watch => {
            let config = load_client_config(cli.api_base_url)?;
            run_watch(&config, &cache_path).await
        }
        Commands::Show { json } => run_show(&cache_path, json).await,
        Commands::Cache { command } => run_cache(command, &cache_path).await,
        Commands::Messages { command } => run_messages(command, &cache_path).await,
        Commands::Login { email, password } => {
            let config = load_client_config(cli.api_base_url)?;
            run_login(&config, &email, &password).await
        }
        Commands::Logout => {
            let config = load_client_config(cli.api_base_url)?;
            run_logout(&config)
        }
        Commands::Publish { file } => {
            let config = load_client_config(cli.api_base_url)?;
            run_publish(&config, &cache_path, &file).await
        }
    }
}
