use std::path::Path;

use folio_core::{AdminClient, ClientConfig, ContentSnapshot};

use crate::auth::SessionStore;
use crate::commands::common::{build_engine, format_outcome_line};
use crate::error::CliError;

pub async fn run_publish(config: &ClientConfig, cache_path: &Path, file: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(file)?;
    let snapshot = ContentSnapshot::parse(&raw)?;
    let token = SessionStore::new(&config.api_base_url).active_token()?;

    let stored = AdminClient::from_config(config)?
        .publish(&snapshot, &token)
        .await?;
    tracing::info!(file = %file.display(), "Published portfolio document");

    let engine = build_engine(config, cache_path).await?;
    let outcome = engine.accept_published(stored).await?;
    println!("Published: {}", format_outcome_line(&outcome));
    Ok(())
}
