//! Freshness markers kept beside the snapshot

use serde::{Deserialize, Serialize};

use super::ContentSnapshot;
use crate::util::blob_digest;

/// Side-channel metadata, never part of the snapshot itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessMarker {
    /// When the cached snapshot last changed (RFC 3339).
    pub last_update_timestamp: Option<String>,
    /// Opaque tag recording which one-time cache migration ran last.
    pub update_version: Option<String>,
    /// When the cached CV reference last changed (RFC 3339).
    pub cv_last_update: Option<String>,
}

/// Digests of the inline CV blobs the remote last served, per slot.
///
/// A local blob whose digest matches came from the remote, so it must not be
/// carried over once the remote drops or replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedCvBlobs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_file: Option<String>,
}

impl ServedCvBlobs {
    pub fn of(snapshot: &ContentSnapshot) -> Self {
        Self {
            cv: snapshot.cv_blob().map(blob_digest),
            cv_file: snapshot.cv_file_blob().map(blob_digest),
        }
    }

    pub fn served_cv(&self, blob: &str) -> bool {
        self.cv.as_deref() == Some(blob_digest(blob).as_str())
    }

    pub fn served_cv_file(&self, blob: &str) -> bool {
        self.cv_file.as_deref() == Some(blob_digest(blob).as_str())
    }
}
