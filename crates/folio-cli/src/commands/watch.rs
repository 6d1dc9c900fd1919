use std::path::Path;
use std::sync::Arc;

use folio_core::sync::{ChangeEvent, ChangeSignal, StorageWatcher};
use folio_core::{ClientConfig, Poller};
use tokio::sync::broadcast::error::RecvError;

use crate::commands::common::{build_engine, format_summary_lines};
use crate::error::CliError;

pub async fn run_watch(config: &ClientConfig, cache_path: &Path) -> Result<(), CliError> {
    let engine = Arc::new(build_engine(config, cache_path).await?);
    let mut events = engine.notifier().subscribe();
    let mut maintenance = engine.context().subscribe_maintenance();
    let mut watcher = StorageWatcher::new(engine.cache().store().clone(), config.poll_interval);
    watcher.prime().await?;

    let poller = Poller::from_config(Arc::clone(&engine), config);
    poller.start();
    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        config.portfolio_endpoint(),
        config.poll_interval.as_secs()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_own_event = None;

    loop {
        // In-process events are drained before the store is polled, so our own
        // signals are recognised when the watcher reads them back.
        tokio::select! {
            biased;
            result = &mut shutdown => {
                result?;
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    last_own_event = Some(event.id);
                    println!("{}", format_change_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change subscriber fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            changed = maintenance.changed() => {
                if changed.is_err() {
                    break;
                }
                let enabled = *maintenance.borrow_and_update();
                println!("Maintenance mode {}", if enabled { "enabled" } else { "disabled" });
            }
            signal = watcher.next_signal() => match signal {
                Ok(signal) if last_own_event == Some(signal.id) => {}
                Ok(signal) => {
                    println!("{}", format_external_signal(&signal));
                    if let Some(snapshot) = engine.cache().load_or_reset().await? {
                        for line in format_summary_lines(&snapshot) {
                            println!("  {line}");
                        }
                    }
                }
                Err(error) => tracing::warn!(%error, "Failed to read change signal"),
            },
        }
    }

    poller.stop();
    println!("Stopped watching");
    Ok(())
}

pub fn format_change_event(event: &ChangeEvent) -> String {
    format!(
        "[{}] content changed (source={}, projects={}, messages={}, unread={})",
        event.emitted_at,
        event.source,
        event.fingerprint.projects,
        event.fingerprint.messages,
        event.fingerprint.unread_messages
    )
}

pub fn format_external_signal(signal: &ChangeSignal) -> String {
    format!(
        "[{}] cache updated by another process (source={})",
        signal.emitted_at, signal.source
    )
}
