use std::path::Path;

use folio_core::{ClientConfig, Fingerprint};
use serde::Serialize;

use crate::commands::common::{build_engine, format_outcome_line, format_summary_lines};
use crate::error::CliError;

#[derive(Serialize)]
struct SyncReport {
    source: String,
    changed: bool,
    persisted: bool,
    fingerprint: Fingerprint,
}

pub async fn run_sync(config: &ClientConfig, cache_path: &Path, as_json: bool) -> Result<(), CliError> {
    let engine = build_engine(config, cache_path).await?;
    let outcome = engine.reconcile_cycle().await;

    if as_json {
        let report = SyncReport {
            source: outcome.source.to_string(),
            changed: outcome.changed,
            persisted: outcome.persisted,
            fingerprint: Fingerprint::of(&outcome.snapshot),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Sync completed: {}", format_outcome_line(&outcome));
    for line in format_summary_lines(&outcome.snapshot) {
        println!("  {line}");
    }
    Ok(())
}
