//! folio-core - Core library for Folio
//!
//! Content models, the local snapshot cache, the remote fetcher, and the
//! reconciliation engine shared by the Folio API and CLI.

pub mod admin;
pub mod cache;
pub mod config;
pub mod db;
pub mod defaults;
pub mod emptiness;
pub mod error;
pub mod fetch;
pub mod models;
pub mod sync;
pub mod util;
pub mod validation;

pub use admin::{AdminClient, AdminSession};
pub use cache::LocalCacheStore;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use fetch::{ContentSource, FetchResult, RemoteFetcher};
pub use models::{ContactMessage, ContentSnapshot, Fingerprint, FreshnessMarker};
pub use sync::{ChangeNotifier, Poller, ReconcileEngine, ReconcileOutcome, SnapshotSource};
