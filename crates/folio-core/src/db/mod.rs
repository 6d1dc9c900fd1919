//! Database layer for Folio

mod connection;
mod document_repository;
mod kv_repository;
mod migrations;

pub use connection::Database;
pub use document_repository::{DocumentRepository, LibSqlDocumentRepository, StoredDocument};
pub use kv_repository::{KeyValueStore, LibSqlKvRepository, LibSqlKvStore, MemoryKvStore};
