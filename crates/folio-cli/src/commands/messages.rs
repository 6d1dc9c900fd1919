use std::path::Path;

use folio_core::db::LibSqlKvStore;
use folio_core::{ChangeNotifier, ContactMessage, ContentSnapshot, LocalCacheStore, SnapshotSource};

use crate::cli::MessageCommands;
use crate::commands::common::{
    format_message_lines, normalize_message_body, open_migrated_cache, parse_message_key,
};
use crate::error::CliError;

pub async fn run_messages(command: MessageCommands, cache_path: &Path) -> Result<(), CliError> {
    let cache = open_migrated_cache(cache_path).await?;

    match command {
        MessageCommands::List { unread, json } => {
            let snapshot = cache.load_or_reset().await?.unwrap_or_default();
            let messages: Vec<&ContactMessage> = snapshot
                .messages()
                .iter()
                .filter(|message| !unread || !message.read)
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if messages.is_empty() {
                println!("No messages.");
            } else {
                for line in format_message_lines(snapshot.messages(), unread) {
                    println!("{line}");
                }
            }
        }
        MessageCommands::Add {
            name,
            email,
            subject,
            message,
        } => {
            let body = normalize_message_body(&message).ok_or(CliError::EmptyMessage)?;
            let subject = subject
                .map(|subject| subject.trim().to_string())
                .filter(|subject| !subject.is_empty());
            let message = ContactMessage::new(name.trim(), email.trim(), subject, body);
            let id = message.id_text().unwrap_or_default();

            let snapshot = cache.add_contact_message(message).await?;
            announce(&cache, &snapshot).await;
            println!("Recorded message {id}");
        }
        MessageCommands::Read { key } => {
            let key = parse_message_key(&key)?;
            let snapshot = cache.mark_message_read(&key).await?;
            announce(&cache, &snapshot).await;
            println!("Marked message as read");
        }
        MessageCommands::Delete { key } => {
            let key = parse_message_key(&key)?;
            let removed = cache.delete_message(&key).await?;
            let snapshot = cache.load_or_default().await?;
            announce(&cache, &snapshot).await;
            println!(
                "Deleted message {}",
                removed.id_text().unwrap_or_else(|| "-".to_string())
            );
        }
    }
    Ok(())
}

/// Let a running `folio watch` in another process know the cache moved.
async fn announce(cache: &LocalCacheStore<LibSqlKvStore>, snapshot: &ContentSnapshot) {
    ChangeNotifier::new(cache.store().clone())
        .notify(snapshot, SnapshotSource::Cache)
        .await;
}
