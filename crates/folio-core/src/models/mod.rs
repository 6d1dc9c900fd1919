//! Data models for Folio

mod fingerprint;
mod freshness;
pub mod lenient;
mod message;
mod snapshot;

pub use fingerprint::Fingerprint;
pub use freshness::{FreshnessMarker, ServedCvBlobs};
pub use message::ContactMessage;
pub use snapshot::{
    About, Certification, ContentSnapshot, Extra, FaqEntry, Links, Maintenance, Personal, Project,
    Service, SiteSettings, Skill, TimelineEntry, STORAGE_METADATA_KEYS,
};
