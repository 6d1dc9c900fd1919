//! Change notification.
//!
//! Subscribers in this process receive [`ChangeEvent`]s over a broadcast
//! channel. Other processes sharing the same store observe a
//! [`ChangeSignal`] record through [`StorageWatcher`]. Delivery is
//! best-effort and at-most-once.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::SnapshotSource;
use crate::db::KeyValueStore;
use crate::error::Result;
use crate::models::{ContentSnapshot, Fingerprint};
use crate::util::now_rfc3339;

pub const CHANGE_SIGNAL_KEY: &str = "folio:change-signal";

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// In-process notification that the displayed content changed.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub fingerprint: Fingerprint,
    pub source: SnapshotSource,
    pub emitted_at: String,
    pub snapshot: Arc<ContentSnapshot>,
}

impl ChangeEvent {
    pub fn signal(&self) -> ChangeSignal {
        ChangeSignal {
            id: self.id,
            fingerprint: self.fingerprint.clone(),
            source: self.source,
            emitted_at: self.emitted_at.clone(),
        }
    }
}

/// Cross-process form of a change event. Receivers reload the cache for
/// the content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSignal {
    pub id: Uuid,
    pub fingerprint: Fingerprint,
    pub source: SnapshotSource,
    pub emitted_at: String,
}

/// Fans change events out to in-process subscribers and to the shared store.
#[derive(Clone)]
pub struct ChangeNotifier<S> {
    sender: broadcast::Sender<ChangeEvent>,
    store: S,
}

impl<S: KeyValueStore> ChangeNotifier<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(store: S, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, store }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Emit a change event for `snapshot`.
    ///
    /// Never fails: a missing subscriber drops the in-process event and a
    /// store error only loses the cross-process signal.
    pub async fn notify(&self, snapshot: &ContentSnapshot, source: SnapshotSource) -> ChangeEvent {
        let event = ChangeEvent {
            id: Uuid::now_v7(),
            fingerprint: Fingerprint::of(snapshot),
            source,
            emitted_at: now_rfc3339(),
            snapshot: Arc::new(snapshot.clone()),
        };

        let delivered = self.sender.send(event.clone()).unwrap_or(0);

        if let Err(error) = self.write_signal(&event.signal()).await {
            tracing::warn!(%error, "Failed to publish cross-process change signal");
        }

        tracing::debug!(
            event_id = %event.id,
            source = %source,
            delivered,
            "Emitted content change"
        );
        event
    }

    async fn write_signal(&self, signal: &ChangeSignal) -> Result<()> {
        let payload = serde_json::to_string(signal)?;
        self.store.set(CHANGE_SIGNAL_KEY, &payload).await
    }
}

/// Polls the shared store for change signals written by other processes.
pub struct StorageWatcher<S> {
    store: S,
    poll_interval: Duration,
    last_seen: Option<Uuid>,
}

impl<S: KeyValueStore> StorageWatcher<S> {
    pub const fn new(store: S, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
            last_seen: None,
        }
    }

    /// Mark the currently stored signal as seen so only later ones surface.
    pub async fn prime(&mut self) -> Result<()> {
        self.last_seen = self.read_signal().await?.map(|signal| signal.id);
        Ok(())
    }

    /// Return a signal not seen before, if one is stored.
    pub async fn poll_once(&mut self) -> Result<Option<ChangeSignal>> {
        let Some(signal) = self.read_signal().await? else {
            return Ok(None);
        };
        if self.last_seen == Some(signal.id) {
            return Ok(None);
        }
        self.last_seen = Some(signal.id);
        Ok(Some(signal))
    }

    /// Wait until a new signal appears.
    pub async fn next_signal(&mut self) -> Result<ChangeSignal> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(signal) = self.poll_once().await? {
                return Ok(signal);
            }
        }
    }

    async fn read_signal(&self) -> Result<Option<ChangeSignal>> {
        let Some(raw) = self.store.get(CHANGE_SIGNAL_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(signal) => Ok(Some(signal)),
            Err(error) => {
                tracing::debug!(%error, "Ignoring unreadable change signal");
                Ok(None)
            }
        }
    }
}
