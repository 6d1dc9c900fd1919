//! Local content cache.
//!
//! Holds the last-known-good snapshot plus freshness markers in a
//! [`KeyValueStore`]. Reads validate at the boundary: a value that fails to
//! parse is reported as [`Error::CacheCorrupted`] and callers reinitialize.

use serde_json::Value;

use crate::db::KeyValueStore;
use crate::defaults::default_snapshot;
use crate::error::{Error, Result};
use crate::models::{ContactMessage, ContentSnapshot, FreshnessMarker, ServedCvBlobs};
use crate::util::now_rfc3339;

pub const SNAPSHOT_KEY: &str = "folio:portfolio-data";
pub const LAST_UPDATE_KEY: &str = "folio:last-update";
pub const UPDATE_VERSION_KEY: &str = "folio:update-version";
pub const CV_LAST_UPDATE_KEY: &str = "folio:cv-last-update";

/// Digests of the CV blobs last served by the remote.
pub const CV_SERVED_KEY: &str = "folio:cv-served";

/// Tag of the newest one-time cache migration.
pub const CURRENT_UPDATE_VERSION: &str = "normalize-v2";

/// Result of a snapshot write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// The stored value actually changed.
    pub written: bool,
    /// The CV reference changed and `cvLastUpdate` was bumped.
    pub cv_changed: bool,
}

/// Address of a contact message for the cache's CRUD operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKey {
    /// Match on the message id.
    Id(String),
    /// 1-based position in the list.
    Position(usize),
}

/// Snapshot cache over a key-value store.
#[derive(Clone)]
pub struct LocalCacheStore<S> {
    store: S,
}

impl<S: KeyValueStore> LocalCacheStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store, shared with the change notifier.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Raw stored snapshot text.
    pub async fn load_raw(&self) -> Result<Option<String>> {
        self.store.get(SNAPSHOT_KEY).await
    }

    /// Load and validate the cached snapshot.
    pub async fn load_snapshot(&self) -> Result<Option<ContentSnapshot>> {
        let Some(raw) = self.load_raw().await? else {
            return Ok(None);
        };
        ContentSnapshot::parse(&raw)
            .map(Some)
            .map_err(|error| Error::CacheCorrupted(error.to_string()))
    }

    /// Load the cached snapshot, discarding a corrupted value.
    pub async fn load_or_reset(&self) -> Result<Option<ContentSnapshot>> {
        match self.load_snapshot().await {
            Err(Error::CacheCorrupted(reason)) => {
                tracing::warn!(%reason, "Discarding corrupted cached snapshot");
                self.store.remove(SNAPSHOT_KEY).await?;
                Ok(None)
            }
            other => other,
        }
    }

    /// Load the cached snapshot, seeding the cache with defaults when absent.
    pub async fn load_or_default(&self) -> Result<ContentSnapshot> {
        if let Some(snapshot) = self.load_or_reset().await? {
            return Ok(snapshot);
        }
        let snapshot = default_snapshot();
        self.save_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// Persist a snapshot if it differs from what is stored.
    ///
    /// Bumps `lastUpdateTimestamp` on every real write and `cvLastUpdate`
    /// when the CV reference changed.
    pub async fn save_snapshot(&self, snapshot: &ContentSnapshot) -> Result<SaveOutcome> {
        let serialized = serde_json::to_string(snapshot)?;
        let previous_raw = self.load_raw().await?;
        if previous_raw.as_deref() == Some(serialized.as_str()) {
            return Ok(SaveOutcome::default());
        }

        let previous_cv = previous_raw
            .as_deref()
            .and_then(|raw| ContentSnapshot::parse(raw).ok())
            .map(|previous| cv_refs(&previous))
            .unwrap_or_default();
        let cv_changed = previous_cv != cv_refs(snapshot);

        self.store.set(SNAPSHOT_KEY, &serialized).await?;
        let now = now_rfc3339();
        self.store.set(LAST_UPDATE_KEY, &now).await?;
        if cv_changed {
            self.store.set(CV_LAST_UPDATE_KEY, &now).await?;
        }

        Ok(SaveOutcome {
            written: true,
            cv_changed,
        })
    }

    /// Read all freshness markers.
    pub async fn markers(&self) -> Result<FreshnessMarker> {
        Ok(FreshnessMarker {
            last_update_timestamp: self.store.get(LAST_UPDATE_KEY).await?,
            update_version: self.store.get(UPDATE_VERSION_KEY).await?,
            cv_last_update: self.store.get(CV_LAST_UPDATE_KEY).await?,
        })
    }

    /// CV blob digests last served by the remote. Unreadable values count as
    /// nothing served.
    pub async fn served_cv_blobs(&self) -> Result<ServedCvBlobs> {
        Ok(self
            .store
            .get(CV_SERVED_KEY)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default())
    }

    /// Record the CV blobs the remote now serves; skips the write when unchanged.
    pub async fn record_served_cv_blobs(&self, served: &ServedCvBlobs) -> Result<()> {
        if self.served_cv_blobs().await? == *served {
            return Ok(());
        }
        if *served == ServedCvBlobs::default() {
            return self.store.remove(CV_SERVED_KEY).await;
        }
        self.store
            .set(CV_SERVED_KEY, &serde_json::to_string(served)?)
            .await
    }

    /// Remove the snapshot and its timestamps; the migration tag is kept.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(CV_SERVED_KEY).await?;
        self.store.remove(SNAPSHOT_KEY).await?;
        self.store.remove(LAST_UPDATE_KEY).await?;
        self.store.remove(CV_LAST_UPDATE_KEY).await
    }

    /// Run the one-time cache migration if the stored tag is outdated.
    ///
    /// The migration re-normalizes the stored snapshot through the schema,
    /// which coerces legacy shapes and strips storage metadata. Returns
    /// whether the migration ran.
    pub async fn migrate(&self) -> Result<bool> {
        let current = self.store.get(UPDATE_VERSION_KEY).await?;
        if current.as_deref() == Some(CURRENT_UPDATE_VERSION) {
            return Ok(false);
        }

        if let Some(snapshot) = self.load_or_reset().await? {
            self.save_snapshot(&snapshot).await?;
        }
        self.store
            .set(UPDATE_VERSION_KEY, CURRENT_UPDATE_VERSION)
            .await?;
        tracing::info!(
            from = current.as_deref().unwrap_or("none"),
            to = CURRENT_UPDATE_VERSION,
            "Migrated local content cache"
        );
        Ok(true)
    }

    /// Read-modify-write of the whole snapshot.
    pub async fn update<F>(&self, mutate: F) -> Result<ContentSnapshot>
    where
        F: FnOnce(&mut ContentSnapshot) + Send,
    {
        let mut snapshot = self.load_or_default().await?;
        mutate(&mut snapshot);
        self.save_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// Append a contact message.
    pub async fn add_contact_message(&self, message: ContactMessage) -> Result<ContentSnapshot> {
        self.update(move |snapshot| {
            snapshot
                .contact_messages
                .get_or_insert_with(Vec::new)
                .push(message);
        })
        .await
    }

    /// Mark a contact message as read. Returns `NotFound` for unknown keys.
    pub async fn mark_message_read(&self, key: &MessageKey) -> Result<ContentSnapshot> {
        let mut snapshot = self.load_or_default().await?;
        let index = find_message(&snapshot, key)?;
        if let Some(message) = snapshot
            .contact_messages
            .as_mut()
            .and_then(|messages| messages.get_mut(index))
        {
            message.read = true;
        }
        self.save_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// Delete a contact message. Returns the removed message.
    pub async fn delete_message(&self, key: &MessageKey) -> Result<ContactMessage> {
        let mut snapshot = self.load_or_default().await?;
        let index = find_message(&snapshot, key)?;
        let removed = snapshot
            .contact_messages
            .as_mut()
            .map(|messages| messages.remove(index))
            .ok_or_else(|| Error::NotFound(format!("{key:?}")))?;
        self.save_snapshot(&snapshot).await?;
        Ok(removed)
    }
}

fn find_message(snapshot: &ContentSnapshot, key: &MessageKey) -> Result<usize> {
    let messages = snapshot.messages();
    let index = match key {
        MessageKey::Id(id) => messages.iter().position(|message| message.matches_id(id)),
        MessageKey::Position(position) => position
            .checked_sub(1)
            .filter(|index| *index < messages.len()),
    };
    index.ok_or_else(|| Error::NotFound(format!("contact message {key:?}")))
}

fn cv_refs(snapshot: &ContentSnapshot) -> (Option<Value>, Option<Value>) {
    snapshot
        .links
        .as_ref()
        .map(|links| (links.cv.clone(), links.cv_file.clone()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryKvStore;

    fn cache() -> LocalCacheStore<MemoryKvStore> {
        LocalCacheStore::new(MemoryKvStore::new())
    }

    fn snapshot(value: serde_json::Value) -> ContentSnapshot {
        ContentSnapshot::from_document(value).unwrap()
    }

    #[tokio::test]
    async fn corrupted_value_is_reported_then_reset() {
        let cache = cache();
        cache.store().set(SNAPSHOT_KEY, "{broken").await.unwrap();

        assert!(matches!(
            cache.load_snapshot().await,
            Err(Error::CacheCorrupted(_))
        ));
        assert_eq!(cache.load_or_reset().await.unwrap(), None);
        assert_eq!(cache.load_raw().await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_or_default_seeds_cache() {
        let cache = cache();
        let seeded = cache.load_or_default().await.unwrap();
        assert_eq!(seeded, default_snapshot());
        assert_eq!(cache.load_snapshot().await.unwrap(), Some(seeded));
        assert!(cache.markers().await.unwrap().last_update_timestamp.is_some());
    }

    #[tokio::test]
    async fn identical_save_is_not_a_write() {
        let cache = cache();
        let value = snapshot(json!({ "skills": [{ "name": "Rust" }] }));

        assert!(cache.save_snapshot(&value).await.unwrap().written);
        let stamp = cache.markers().await.unwrap().last_update_timestamp;

        let outcome = cache.save_snapshot(&value).await.unwrap();
        assert!(!outcome.written);
        assert_eq!(cache.markers().await.unwrap().last_update_timestamp, stamp);
    }

    #[tokio::test]
    async fn cv_marker_tracks_cv_changes_only() {
        let cache = cache();
        let first = snapshot(json!({ "links": { "cv": "/cv-2023.pdf" } }));
        assert!(cache.save_snapshot(&first).await.unwrap().cv_changed);

        let same_cv = snapshot(json!({ "links": { "cv": "/cv-2023.pdf" }, "faq": [] }));
        let outcome = cache.save_snapshot(&same_cv).await.unwrap();
        assert!(outcome.written);
        assert!(!outcome.cv_changed);

        let new_cv = snapshot(json!({ "links": { "cv": "/cv-2024.pdf" } }));
        assert!(cache.save_snapshot(&new_cv).await.unwrap().cv_changed);
    }

    #[tokio::test]
    async fn migration_normalizes_legacy_shapes_once() {
        let cache = cache();
        cache
            .store()
            .set(
                SNAPSHOT_KEY,
                r#"{"_id":"abc","__v":3,"projects":{"title":"Only"}}"#,
            )
            .await
            .unwrap();

        assert!(cache.migrate().await.unwrap());
        assert_eq!(
            cache.load_raw().await.unwrap().as_deref(),
            Some(r#"{"projects":[{"title":"Only"}]}"#)
        );
        assert_eq!(
            cache.markers().await.unwrap().update_version.as_deref(),
            Some(CURRENT_UPDATE_VERSION)
        );
        assert!(!cache.migrate().await.unwrap());
    }

    #[tokio::test]
    async fn message_crud_round_trip() {
        let cache = cache();
        cache
            .save_snapshot(&snapshot(json!({ "projects": [{}] })))
            .await
            .unwrap();

        let message = ContactMessage::new("Ada", "ada@example.com", None, "Hi there");
        let id = message.id_text().unwrap();
        let updated = cache.add_contact_message(message).await.unwrap();
        assert_eq!(updated.message_count(), 1);
        assert_eq!(updated.projects.as_ref().map(Vec::len), Some(1));

        let read = cache
            .mark_message_read(&MessageKey::Id(id.clone()))
            .await
            .unwrap();
        assert!(read.messages()[0].read);

        let removed = cache
            .delete_message(&MessageKey::Position(1))
            .await
            .unwrap();
        assert_eq!(removed.id_text(), Some(id));
        assert_eq!(
            cache.load_snapshot().await.unwrap().unwrap().message_count(),
            0
        );
    }

    #[tokio::test]
    async fn served_cv_record_survives_reads_and_is_cleared_with_snapshot() {
        let cache = cache();
        assert_eq!(cache.served_cv_blobs().await.unwrap(), ServedCvBlobs::default());

        let served = ServedCvBlobs::of(&snapshot(json!({
            "links": { "cv": "data:application/pdf;base64,JVBER" }
        })));
        cache.record_served_cv_blobs(&served).await.unwrap();
        let stored = cache.served_cv_blobs().await.unwrap();
        assert_eq!(stored, served);
        assert!(stored.served_cv("data:application/pdf;base64,JVBER"));
        assert!(!stored.served_cv_file("data:application/pdf;base64,JVBER"));

        cache.clear().await.unwrap();
        assert_eq!(cache.store().get(CV_SERVED_KEY).await.unwrap(), None);

        cache.store().set(CV_SERVED_KEY, "[oops").await.unwrap();
        assert_eq!(cache.served_cv_blobs().await.unwrap(), ServedCvBlobs::default());
    }

    #[tokio::test]
    async fn unknown_message_key_is_not_found() {
        let cache = cache();
        let err = cache
            .delete_message(&MessageKey::Position(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
