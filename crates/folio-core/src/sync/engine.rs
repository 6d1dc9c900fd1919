//! Reconciliation engine.
//!
//! Decides, once per cycle, whether the remote document, the local cache, or
//! the built-in defaults become the displayed snapshot. Tie-break order:
//!
//! 1. Fetch the remote document.
//! 2. Unreachable or malformed: keep a non-empty cache untouched, otherwise
//!    persist defaults.
//! 3. Empty: same as above; an empty remote never wipes real local content.
//! 4. Success: persist the remote document after carrying over contact
//!    messages and locally uploaded CV blobs the remote copy lacks. A blob the
//!    remote itself served earlier is not carried over once it is gone.
//! 5. Notify when the fingerprint moved.
//! 6. Re-evaluate the maintenance gate regardless of the fingerprint.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

use super::notifier::ChangeNotifier;
use super::SnapshotSource;
use crate::cache::LocalCacheStore;
use crate::db::KeyValueStore;
use crate::defaults::default_snapshot;
use crate::emptiness::is_empty;
use crate::error::Result;
use crate::fetch::{ContentSource, FetchResult};
use crate::models::{ContentSnapshot, Fingerprint, Links, ServedCvBlobs};

/// Per-client reconciliation state.
pub struct SyncContext {
    last_fingerprint: Mutex<Option<Fingerprint>>,
    maintenance: watch::Sender<bool>,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncContext {
    pub fn new() -> Self {
        let (maintenance, _) = watch::channel(false);
        Self {
            last_fingerprint: Mutex::new(None),
            maintenance,
        }
    }

    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        self.last_fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `fingerprint`, returning whether it differs from the previous one.
    pub fn record_fingerprint(&self, fingerprint: Fingerprint) -> bool {
        let mut last = self
            .last_fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&fingerprint) {
            return false;
        }
        *last = Some(fingerprint);
        true
    }

    pub fn maintenance_enabled(&self) -> bool {
        *self.maintenance.borrow()
    }

    /// Receiver that observes maintenance gate transitions.
    pub fn subscribe_maintenance(&self) -> watch::Receiver<bool> {
        self.maintenance.subscribe()
    }

    /// Returns whether the gate flipped.
    pub fn set_maintenance(&self, enabled: bool) -> bool {
        self.maintenance.send_if_modified(|current| {
            if *current == enabled {
                false
            } else {
                *current = enabled;
                true
            }
        })
    }
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub snapshot: ContentSnapshot,
    pub source: SnapshotSource,
    /// The fingerprint moved and subscribers were notified.
    pub changed: bool,
    /// The cache was written.
    pub persisted: bool,
}

/// Merges remote, cached, and default content for one client.
pub struct ReconcileEngine<S, F> {
    cache: LocalCacheStore<S>,
    source: F,
    notifier: ChangeNotifier<S>,
    context: SyncContext,
    dev_mode: bool,
}

struct Resolved {
    snapshot: ContentSnapshot,
    source: SnapshotSource,
    persisted: bool,
}

impl<S: KeyValueStore, F: ContentSource> ReconcileEngine<S, F> {
    pub fn new(cache: LocalCacheStore<S>, source: F, notifier: ChangeNotifier<S>) -> Self {
        Self {
            cache,
            source,
            notifier,
            context: SyncContext::new(),
            dev_mode: false,
        }
    }

    #[must_use]
    pub const fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub const fn cache(&self) -> &LocalCacheStore<S> {
        &self.cache
    }

    pub const fn notifier(&self) -> &ChangeNotifier<S> {
        &self.notifier
    }

    pub const fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Run one cycle and return the snapshot to display.
    pub async fn reconcile(&self) -> ContentSnapshot {
        self.reconcile_cycle().await.snapshot
    }

    /// Run one cycle. Never fails; errors fall back to cache or defaults.
    pub async fn reconcile_cycle(&self) -> ReconcileOutcome {
        let resolved = match self.resolve().await {
            Ok(resolved) => resolved,
            Err(error) => {
                self.report("Reconciliation failed; using fallback content", &error.to_string());
                self.fallback().await
            }
        };
        self.finish(resolved).await
    }

    /// Write an admin-published snapshot through to the cache and notify.
    pub async fn accept_published(&self, snapshot: ContentSnapshot) -> Result<ReconcileOutcome> {
        let saved = self.cache.save_snapshot(&snapshot).await?;
        self.cache
            .record_served_cv_blobs(&ServedCvBlobs::of(&snapshot))
            .await?;
        Ok(self
            .finish(Resolved {
                snapshot,
                source: SnapshotSource::Admin,
                persisted: saved.written,
            })
            .await)
    }

    async fn resolve(&self) -> Result<Resolved> {
        let fetched = self.source.fetch().await;
        let local = self.cache.load_or_reset().await?;

        match fetched {
            FetchResult::Unreachable(reason) | FetchResult::MalformedResponse(reason) => {
                self.report("Remote content unavailable", &reason);
                self.keep_local_or_defaults(local).await
            }
            FetchResult::Empty => {
                if local.as_ref().is_some_and(|local| !is_empty(local)) {
                    self.report("Remote document is empty; keeping cached content", "empty");
                }
                self.keep_local_or_defaults(local).await
            }
            FetchResult::Success(mut remote) => {
                let served = ServedCvBlobs::of(&remote);
                if let Some(local) = &local {
                    let previously_served = self.cache.served_cv_blobs().await?;
                    preserve_cv_blobs(&mut remote, local, &previously_served);
                    preserve_messages(&mut remote, local);
                }
                let saved = self.cache.save_snapshot(&remote).await?;
                self.cache.record_served_cv_blobs(&served).await?;
                Ok(Resolved {
                    snapshot: remote,
                    source: SnapshotSource::Remote,
                    persisted: saved.written,
                })
            }
        }
    }

    async fn keep_local_or_defaults(&self, local: Option<ContentSnapshot>) -> Result<Resolved> {
        match local {
            Some(local) if !is_empty(&local) => Ok(Resolved {
                snapshot: local,
                source: SnapshotSource::Cache,
                persisted: false,
            }),
            local => {
                let mut defaults = default_snapshot();
                if let Some(local) = &local {
                    preserve_messages(&mut defaults, local);
                }
                let saved = self.cache.save_snapshot(&defaults).await?;
                Ok(Resolved {
                    snapshot: defaults,
                    source: SnapshotSource::Defaults,
                    persisted: saved.written,
                })
            }
        }
    }

    async fn fallback(&self) -> Resolved {
        match self.cache.load_snapshot().await {
            Ok(Some(snapshot)) => Resolved {
                snapshot,
                source: SnapshotSource::Cache,
                persisted: false,
            },
            _ => Resolved {
                snapshot: default_snapshot(),
                source: SnapshotSource::Defaults,
                persisted: false,
            },
        }
    }

    async fn finish(&self, resolved: Resolved) -> ReconcileOutcome {
        let Resolved {
            snapshot,
            source,
            persisted,
        } = resolved;

        let changed = self.context.record_fingerprint(Fingerprint::of(&snapshot));
        if changed {
            self.notifier.notify(&snapshot, source).await;
        }

        let maintenance = snapshot.maintenance_enabled();
        if self.context.set_maintenance(maintenance) {
            tracing::info!(enabled = maintenance, "Maintenance mode changed");
        }

        ReconcileOutcome {
            snapshot,
            source,
            changed,
            persisted,
        }
    }

    fn report(&self, message: &str, reason: &str) {
        if self.dev_mode {
            tracing::warn!(%reason, "{message}");
        } else {
            tracing::debug!(%reason, "{message}");
        }
    }
}

/// Keep the local message list when the candidate carries fewer messages.
fn preserve_messages(candidate: &mut ContentSnapshot, local: &ContentSnapshot) {
    if candidate.message_count() < local.message_count() {
        tracing::debug!(
            candidate = candidate.message_count(),
            local = local.message_count(),
            "Preserving local contact messages"
        );
        candidate.contact_messages.clone_from(&local.contact_messages);
    }
}

/// Carry locally uploaded CV blobs over slots where the remote copy has none.
///
/// Blobs the remote served before are skipped, so an admin replacement or
/// removal propagates.
fn preserve_cv_blobs(
    remote: &mut ContentSnapshot,
    local: &ContentSnapshot,
    previously_served: &ServedCvBlobs,
) {
    if remote.cv_blob().is_none() {
        if let Some(blob) = local
            .cv_blob()
            .filter(|blob| !previously_served.served_cv(blob))
        {
            links_mut(remote).cv = Some(Value::String(blob.to_string()));
        }
    }
    if remote.cv_file_blob().is_none() {
        if let Some(blob) = local
            .cv_file_blob()
            .filter(|blob| !previously_served.served_cv_file(blob))
        {
            links_mut(remote).cv_file = Some(Value::String(blob.to_string()));
        }
    }
}

fn links_mut(snapshot: &mut ContentSnapshot) -> &mut Links {
    snapshot.links.get_or_insert_with(Links::default)
}
