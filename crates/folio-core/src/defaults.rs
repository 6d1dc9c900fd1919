//! Built-in fallback content shown when neither cache nor API has anything.

use serde_json::json;

use crate::models::ContentSnapshot;

/// Hardcoded starter snapshot.
pub fn default_snapshot() -> ContentSnapshot {
    let document = json!({
        "personal": {
            "name": "Your Name",
            "title": "Software Engineer",
            "email": "hello@example.com",
            "location": "Earth",
            "bio": "I build reliable software and write about it."
        },
        "projects": [
            {
                "title": "Portfolio Website",
                "description": "This site: a static front-end with a small content API.",
                "technologies": ["Rust", "HTML", "CSS"],
                "category": "web"
            },
            {
                "title": "Command-line Toolkit",
                "description": "Small utilities for everyday automation.",
                "technologies": ["Rust"],
                "category": "tools"
            }
        ],
        "skills": [
            { "name": "Rust", "level": 90, "category": "languages" },
            { "name": "TypeScript", "level": 80, "category": "languages" },
            { "name": "SQL", "level": 75, "category": "data" }
        ],
        "links": {
            "github": "https://github.com/",
            "linkedin": "https://www.linkedin.com/"
        },
        "about": {
            "description": "Engineer focused on dependable systems.",
            "stats": {
                "yearsExperience": 5,
                "projectsCompleted": 20,
                "happyClients": 10
            }
        },
        "timeline": [
            {
                "title": "Software Engineer",
                "organization": "Example Corp",
                "period": "2021 - Present",
                "description": "Backend services and tooling."
            }
        ],
        "services": [
            { "title": "Backend Development", "description": "APIs and data pipelines." }
        ],
        "certifications": [],
        "contactMessages": [],
        "faq": [
            {
                "question": "Are you available for freelance work?",
                "answer": "Get in touch through the contact form."
            }
        ],
        "settings": {
            "maintenance": { "enabled": false }
        }
    });

    ContentSnapshot::from_document(document).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emptiness::is_empty;

    #[test]
    fn defaults_are_not_empty() {
        let snapshot = default_snapshot();
        assert!(!is_empty(&snapshot));
        assert_eq!(snapshot.message_count(), 0);
        assert!(!snapshot.maintenance_enabled());
    }
}
