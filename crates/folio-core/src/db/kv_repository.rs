//! Key-value storage backing the local content cache

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use libsql::Connection;
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};

/// Persistent string key-value store shared by every component of one client.
///
/// Futures are `Send` so stores can be driven from spawned tasks.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// Read a value, `None` when the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete a key; deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// libSQL implementation over the `kv_entries` table
pub struct LibSqlKvRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlKvRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_entries WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)",
                libsql::params![key, value, now],
            )
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

/// Shared, cloneable libSQL-backed store.
///
/// Several processes may open the same file; last writer wins.
#[derive(Clone)]
pub struct LibSqlKvStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlKvStore {
    /// Open (or create) a store file.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path).await?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

impl KeyValueStore for LibSqlKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        LibSqlKvRepository::new(db.connection()).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlKvRepository::new(db.connection())
            .set(key, value)
            .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlKvRepository::new(db.connection()).remove(key).await
    }
}

/// Volatile store for tests and single-process embedding.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<StdMutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|error| Error::Database(error.to_string()))?;
        Ok(f(&mut guard))
    }
}

impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn exercise(store: impl KeyValueStore) {
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn libsql_store_get_set_remove() {
        exercise(LibSqlKvStore::open_in_memory().await.unwrap()).await;
    }

    #[tokio::test]
    async fn memory_store_get_set_remove() {
        exercise(MemoryKvStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn libsql_store_persists_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cache.db");

        {
            let store = LibSqlKvStore::open_path(&path).await.unwrap();
            store.set("folio:test", "persisted").await.unwrap();
        }

        let reopened = LibSqlKvStore::open_path(&path).await.unwrap();
        assert_eq!(
            reopened.get("folio:test").await.unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[tokio::test]
    async fn memory_store_clones_share_entries() {
        let store = MemoryKvStore::new();
        let other = store.clone();
        store.set("shared", "yes").await.unwrap();
        assert_eq!(other.get("shared").await.unwrap().as_deref(), Some("yes"));
    }
}
