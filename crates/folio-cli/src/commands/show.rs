use std::path::Path;

use crate::commands::common::{format_summary_lines, open_migrated_cache};
use crate::error::CliError;

pub async fn run_show(cache_path: &Path, as_json: bool) -> Result<(), CliError> {
    let cache = open_migrated_cache(cache_path).await?;
    let Some(snapshot) = cache.load_or_reset().await? else {
        println!("Cache is empty. Run `folio sync` first.");
        return Ok(());
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for line in format_summary_lines(&snapshot) {
        println!("{line}");
    }
    Ok(())
}
