//! Emptiness classification.
//!
//! The backend may legitimately return a document with empty collections (a
//! new portfolio, or everything cleared by the admin). That must be told apart
//! from a stub returned when the document layer failed. A photo or an inline
//! CV counts as real content even when every collection is empty.

use crate::models::ContentSnapshot;

/// Returns `true` when the snapshot carries no real content.
pub fn is_empty(snapshot: &ContentSnapshot) -> bool {
    let no_projects = snapshot.projects.as_ref().map_or(true, Vec::is_empty);
    let no_skills = snapshot.skills.as_ref().map_or(true, Vec::is_empty);
    let no_timeline = snapshot.timeline.as_ref().map_or(true, Vec::is_empty);
    let no_photo = snapshot
        .personal
        .as_ref()
        .and_then(|personal| personal.photo())
        .is_none();
    let no_cv_blob = snapshot.cv_blob().is_none() && snapshot.cv_file_blob().is_none();

    no_projects && no_skills && no_timeline && no_photo && no_cv_blob
}
