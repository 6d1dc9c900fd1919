use std::path::Path;

use chrono::Utc;

use crate::cli::CacheCommands;
use crate::commands::common::{format_marker_lines, open_cache};
use crate::error::CliError;

pub async fn run_cache(command: CacheCommands, cache_path: &Path) -> Result<(), CliError> {
    let cache = open_cache(cache_path).await?;

    match command {
        CacheCommands::Markers { json } => {
            let markers = cache.markers().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&markers)?);
            } else {
                for line in format_marker_lines(&markers, Utc::now()) {
                    println!("{line}");
                }
            }
        }
        CacheCommands::Clear => {
            cache.clear().await?;
            println!("Cleared cached content at {}", cache_path.display());
        }
        CacheCommands::Migrate => {
            let migrated = cache.migrate().await?;
            let version = cache.markers().await?.update_version;
            let version = version.as_deref().unwrap_or("unknown");
            if migrated {
                println!("Migrated cache to {version}");
            } else {
                println!("Cache is already at {version}");
            }
        }
    }
    Ok(())
}
