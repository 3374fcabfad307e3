//! Canonical resume document.
//!
//! Every struct is closed: unknown fields are rejected at deserialization
//! rather than silently dropped. Missing fields fall back to their defaults so
//! that malformed input can still be canonicalized; the schema validator is the
//! authority on whether a document is acceptable.

use serde::{Deserialize, Serialize};

/// Literal accepted by every date field in place of a `YYYY-MM` value.
pub const PRESENT: &str = "Present";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Basics {
    pub name: String,
    pub label: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkEntry {
    pub position: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub bullets: Vec<String>,
}

impl WorkEntry {
    /// True when every required field carries a value. Items failing this are
    /// never emitted by the heuristic structurer.
    pub fn is_complete(&self) -> bool {
        !self.position.is_empty()
            && !self.company.is_empty()
            && !self.location.is_empty()
            && !self.start_date.is_empty()
            && !self.end_date.is_empty()
            && !self.bullets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectEntry {
    pub name: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EducationEntry {
    pub institution: String,
    pub study_type: String,
    pub area: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EducationEntry {
    pub fn is_complete(&self) -> bool {
        !self.institution.is_empty()
            && !self.study_type.is_empty()
            && !self.area.is_empty()
            && !self.start_date.is_empty()
            && !self.end_date.is_empty()
    }
}

/// The whole resume. Arrays are always serialized, never omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resume {
    pub basics: Basics,
    pub summary: String,
    pub skills: Vec<String>,
    pub work: Vec<WorkEntry>,
    pub projects: Vec<ProjectEntry>,
    pub education: Vec<EducationEntry>,
    pub certs: Vec<String>,
}

impl Resume {
    /// Converts into the dynamic value the patch engine and validator work on.
    pub fn to_value(&self) -> serde_json::Value {
        // Serializing plain strings and vectors cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arrays_always_serialized() {
        let value = Resume::default().to_value();
        for key in ["skills", "work", "projects", "education", "certs"] {
            assert_eq!(value[key], json!([]), "{key} should be an empty array");
        }
        assert_eq!(value["basics"]["links"], json!([]));
        assert!(value["basics"].get("location").is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let raw = json!({ "basics": { "name": "A", "nickname": "B" } });
        assert!(Resume::from_value(raw).is_err());
    }

    #[test]
    fn test_camel_case_dates() {
        let raw = json!({
            "work": [{
                "position": "Engineer",
                "company": "Acme",
                "location": "Remote",
                "startDate": "2021-01",
                "endDate": "Present",
                "bullets": ["Shipped"]
            }]
        });
        let resume = Resume::from_value(raw).unwrap();
        assert_eq!(resume.work[0].start_date, "2021-01");
        assert!(resume.work[0].is_complete());
    }

    #[test]
    fn test_work_without_position_is_incomplete() {
        let entry = WorkEntry {
            company: "Acme".into(),
            location: "Remote".into(),
            start_date: "2020-01".into(),
            end_date: PRESENT.into(),
            bullets: vec!["x".into()],
            ..Default::default()
        };
        assert!(!entry.is_complete());
    }
}
