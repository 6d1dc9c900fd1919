//! Freshness reconciliation between the remote API, the local cache, and
//! built-in defaults.

mod engine;
mod notifier;
mod poller;

use serde::{Deserialize, Serialize};

pub use engine::{ReconcileEngine, ReconcileOutcome, SyncContext};
pub use notifier::{ChangeEvent, ChangeNotifier, ChangeSignal, StorageWatcher, CHANGE_SIGNAL_KEY};
pub use poller::{Poller, PollerState, Visibility};

/// Where the snapshot produced by a cycle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Fresh document from the API.
    Remote,
    /// Last-known-good local cache.
    Cache,
    /// Built-in defaults.
    Defaults,
    /// Written by an admin publish from this client.
    Admin,
}

impl SnapshotSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Cache => "cache",
            Self::Defaults => "defaults",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
