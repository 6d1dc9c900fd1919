//! Server-side storage of the single portfolio document

use libsql::Connection;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::ContentSnapshot;

/// The stored document plus the metadata the storage layer maintains.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub snapshot: ContentSnapshot,
    pub revision: i64,
    pub updated_at: String,
}

impl StoredDocument {
    /// Render the document the way it goes over the wire, with storage
    /// metadata (`_id`, `__v`, `updatedAt`) mixed into the top level.
    pub fn to_wire(&self) -> Result<Value> {
        let mut object = match serde_json::to_value(&self.snapshot)? {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        object.insert("_id".to_string(), Value::String("portfolio".to_string()));
        object.insert("__v".to_string(), Value::from(self.revision));
        object.insert(
            "updatedAt".to_string(),
            Value::String(self.updated_at.clone()),
        );
        Ok(Value::Object(object))
    }
}

/// Trait for portfolio document storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DocumentRepository {
    /// Load the current document, `None` before the first publish
    async fn load(&self) -> Result<Option<StoredDocument>>;

    /// Replace the document wholesale and bump its revision
    async fn save(&self, snapshot: &ContentSnapshot) -> Result<StoredDocument>;
}

/// libSQL implementation of `DocumentRepository`
pub struct LibSqlDocumentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDocumentRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DocumentRepository for LibSqlDocumentRepository<'_> {
    async fn load(&self) -> Result<Option<StoredDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body, revision, updated_at FROM portfolio_documents WHERE id = 1",
                (),
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let body: String = row.get(0)?;
        let revision: i64 = row.get(1)?;
        let updated_at: String = row.get(2)?;
        let snapshot = ContentSnapshot::parse(&body)
            .map_err(|error| Error::Database(format!("stored document is invalid: {error}")))?;

        Ok(Some(StoredDocument {
            snapshot,
            revision,
            updated_at,
        }))
    }

    async fn save(&self, snapshot: &ContentSnapshot) -> Result<StoredDocument> {
        let body = serde_json::to_string(snapshot)?;
        let updated_at = crate::util::now_rfc3339();

        self.conn
            .execute(
                "INSERT INTO portfolio_documents (id, body, revision, updated_at)
                 VALUES (1, ?1, 1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     body = excluded.body,
                     revision = portfolio_documents.revision + 1,
                     updated_at = excluded.updated_at",
                libsql::params![body, updated_at],
            )
            .await?;

        self.load()
            .await?
            .ok_or_else(|| Error::Database("document vanished after save".to_string()))
    }
}
