//! Cheap change fingerprint

use serde::{Deserialize, Serialize};

use super::ContentSnapshot;

/// Derived summary used to decide whether a snapshot changed.
///
/// Counts plus a few scalar markers. Two different snapshots may share a
/// fingerprint; the only consequence is a skipped re-render, because the cache
/// always holds the full document. Maintenance settings are not included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub projects: usize,
    pub skills: usize,
    pub timeline: usize,
    pub services: usize,
    pub certifications: usize,
    pub faq: usize,
    pub messages: usize,
    pub unread_messages: usize,
    pub name: Option<String>,
    pub has_photo: bool,
    pub has_cv: bool,
}

impl Fingerprint {
    /// Compute the fingerprint of a snapshot.
    pub fn of(snapshot: &ContentSnapshot) -> Self {
        Self {
            projects: len_of(snapshot.projects.as_ref()),
            skills: len_of(snapshot.skills.as_ref()),
            timeline: len_of(snapshot.timeline.as_ref()),
            services: len_of(snapshot.services.as_ref()),
            certifications: len_of(snapshot.certifications.as_ref()),
            faq: len_of(snapshot.faq.as_ref()),
            messages: snapshot.message_count(),
            unread_messages: snapshot
                .messages()
                .iter()
                .filter(|message| !message.read)
                .count(),
            name: snapshot
                .personal
                .as_ref()
                .and_then(|personal| personal.name.clone()),
            has_photo: snapshot
                .personal
                .as_ref()
                .and_then(super::Personal::photo)
                .is_some(),
            has_cv: snapshot.has_cv_reference(),
        }
    }
}

fn len_of<T>(items: Option<&Vec<T>>) -> usize {
    items.map_or(0, Vec::len)
}
