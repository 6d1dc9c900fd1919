//! Portfolio content snapshot model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::ContactMessage;
use crate::util::is_inline_blob;

/// Unknown keys carried through untouched.
pub type Extra = Map<String, Value>;

/// Top-level keys injected by the document store that are not content.
pub const STORAGE_METADATA_KEYS: [&str; 5] = ["_id", "__v", "id", "createdAt", "updatedAt"];

/// The full portfolio content document exchanged between client and backend.
///
/// Every field is optional. Sequences tolerate malformed scalars and records
/// tolerate wrong types (see [`lenient`]); unknown top-level keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    #[serde(
        default,
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub personal: Option<Personal>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub projects: Option<Vec<Project>>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub skills: Option<Vec<Skill>>,
    #[serde(
        default,
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub links: Option<Links>,
    #[serde(
        default,
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub about: Option<About>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeline: Option<Vec<TimelineEntry>>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub services: Option<Vec<Service>>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub certifications: Option<Vec<Certification>>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_messages: Option<Vec<ContactMessage>>,
    #[serde(
        default,
        deserialize_with = "lenient::seq",
        skip_serializing_if = "Option::is_none"
    )]
    pub faq: Option<Vec<FaqEntry>>,
    #[serde(
        default,
        deserialize_with = "lenient::record",
        skip_serializing_if = "Option::is_none"
    )]
    pub settings: Option<SiteSettings>,
}

impl ContentSnapshot {
    /// Decode a snapshot from an arbitrary JSON value.
    ///
    /// Storage metadata keys are stripped first. Returns `None` only when the
    /// value is not a JSON object.
    pub fn from_document(mut value: Value) -> Option<Self> {
        let object = value.as_object_mut()?;
        for key in STORAGE_METADATA_KEYS {
            object.remove(key);
        }
        // Fields are individually lenient, so an object always decodes.
        serde_json::from_value(value).ok()
    }

    /// Decode a snapshot from raw JSON text.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_document(value).ok_or_else(|| {
            crate::Error::MalformedResponse("document is not a JSON object".to_string())
        })
    }

    /// Contact messages, empty when absent.
    pub fn messages(&self) -> &[ContactMessage] {
        self.contact_messages.as_deref().unwrap_or_default()
    }

    /// Number of contact messages (absent counts as zero).
    pub fn message_count(&self) -> usize {
        self.messages().len()
    }

    /// Whether `settings.maintenance.enabled` is set.
    pub fn maintenance_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .and_then(|settings| settings.maintenance.as_ref())
            .is_some_and(|maintenance| maintenance.enabled)
    }

    /// Inline CV blob stored under `links.cv`, if any.
    pub fn cv_blob(&self) -> Option<&str> {
        self.links.as_ref().and_then(|links| blob_of(links.cv.as_ref()))
    }

    /// Inline CV blob stored under `links.cvFile`, if any.
    pub fn cv_file_blob(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| blob_of(links.cv_file.as_ref()))
    }

    /// Whether either CV slot carries any reference (blob, path, or URL).
    pub fn has_cv_reference(&self) -> bool {
        self.links.as_ref().is_some_and(|links| {
            [links.cv.as_ref(), links.cv_file.as_ref()]
                .into_iter()
                .flatten()
                .any(|value| value.as_str().is_some_and(|text| !text.trim().is_empty()))
        })
    }
}

fn blob_of(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| is_inline_blob(text))
}

/// Owner identity block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personal {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Personal {
    /// Photo reference when present and non-blank.
    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref().filter(|photo| !photo.trim().is_empty())
    }
}

/// A showcased project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient::seq", skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A skill with an optional proficiency level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// External links, including the CV slots.
///
/// `cv` and `cvFile` hold either a path/URL or an inline blob; they stay
/// untyped so that neither shape is lost on a round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_file: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// About section with free-form headline statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct About {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub stats: Option<Extra>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Career or education milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Offered service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Certification or award.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Frequently asked question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Site-wide switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Maintenance gate; when enabled the public view shows a holding page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maintenance {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn single_project_object_is_coerced_to_list() {
        let snapshot = ContentSnapshot::from_document(json!({
            "projects": { "title": "Solo" }
        }))
        .unwrap();
        let projects = snapshot.projects.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title.as_deref(), Some("Solo"));
    }

    #[test]
    fn storage_metadata_is_stripped() {
        let snapshot = ContentSnapshot::from_document(json!({
            "_id": "65f0",
            "__v": 7,
            "updatedAt": "2024-01-01T00:00:00Z",
            "skills": [{ "name": "Rust" }]
        }))
        .unwrap();
        let rendered = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(rendered, json!({ "skills": [{ "name": "Rust" }] }));
    }

    #[test]
    fn malformed_records_become_absent() {
        let snapshot = ContentSnapshot::from_document(json!({
            "personal": "not a record",
            "links": null,
            "settings": 5
        }))
        .unwrap();
        assert!(snapshot.personal.is_none());
        assert!(snapshot.links.is_none());
        assert!(!snapshot.maintenance_enabled());
    }

    #[test]
    fn unknown_record_keys_survive_round_trip() {
        let document = json!({
            "personal": { "name": "Ada", "tagline": "Engines" },
            "projects": [{ "title": "A", "stars": 12 }]
        });
        let snapshot = ContentSnapshot::from_document(document.clone()).unwrap();
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), document);
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(ContentSnapshot::from_document(json!([1, 2])).is_none());
        assert!(matches!(
            ContentSnapshot::parse("\"text\""),
            Err(crate::Error::MalformedResponse(_))
        ));
        assert!(matches!(
            ContentSnapshot::parse("{not json"),
            Err(crate::Error::Serialization(_))
        ));
    }

    #[test]
    fn cv_blob_accessors() {
        let snapshot = ContentSnapshot::from_document(json!({
            "links": {
                "cv": "/files/cv.pdf",
                "cvFile": "data:application/pdf;base64,JVBER"
            }
        }))
        .unwrap();
        assert_eq!(snapshot.cv_blob(), None);
        assert_eq!(
            snapshot.cv_file_blob(),
            Some("data:application/pdf;base64,JVBER")
        );
        assert!(snapshot.has_cv_reference());
    }

    #[test]
    fn maintenance_flag_reads_loose_values() {
        let snapshot = ContentSnapshot::from_document(json!({
            "settings": { "maintenance": { "enabled": "true" } }
        }))
        .unwrap();
        assert!(snapshot.maintenance_enabled());
    }
}
