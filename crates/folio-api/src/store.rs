//! Shared handle to the server-side portfolio document.

use std::path::Path;
use std::sync::Arc;

use folio_core::db::{Database, DocumentRepository, LibSqlDocumentRepository, StoredDocument};
use folio_core::{ContentSnapshot, Result};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Mutex<Database>>,
}

impl DocumentStore {
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub async fn load(&self) -> Result<Option<StoredDocument>> {
        let db = self.db.lock().await;
        LibSqlDocumentRepository::new(db.connection()).load().await
    }

    pub async fn save(&self, snapshot: &ContentSnapshot) -> Result<StoredDocument> {
        let db = self.db.lock().await;
        LibSqlDocumentRepository::new(db.connection())
            .save(snapshot)
            .await
    }

    /// Current revision, `0` before the first publish.
    pub async fn revision(&self) -> Result<i64> {
        Ok(self.load().await?.map_or(0, |document| document.revision))
    }
}
