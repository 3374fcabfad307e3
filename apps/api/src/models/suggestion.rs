//! Edit operations ("suggestions") and the envelope they travel in.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Replace,
    Insert,
    Delete,
}

impl EditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditKind::Replace => "replace",
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    FromResume,
    FromJd,
    FromUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Summary,
    Skills,
    Work,
    Projects,
    Education,
    Certs,
}

/// Priority 1 (highest) to 3. Serialized as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("priority must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// One edit instruction addressed by a JSON pointer.
///
/// `old_value`/`new_value` distinguish "absent" (`None`) from an explicit JSON
/// `null` (`Some(Value::Null)`); only absence violates the structural contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Suggestion {
    pub id: String,
    pub path: String,
    pub kind: EditKind,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_value: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_value: Option<Value>,
    pub rationale: String,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionName>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Suggestion {
    fn bare(id: &str, path: &str, kind: EditKind) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            kind,
            old_value: None,
            new_value: None,
            rationale: String::new(),
            provenance: Provenance::FromUser,
            confidence: None,
            priority: None,
            section: None,
        }
    }

    pub fn replace(id: &str, path: &str, old_value: Value, new_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            new_value: Some(new_value),
            ..Self::bare(id, path, EditKind::Replace)
        }
    }

    pub fn insert(id: &str, path: &str, new_value: Value) -> Self {
        Self {
            new_value: Some(new_value),
            ..Self::bare(id, path, EditKind::Insert)
        }
    }

    pub fn delete(id: &str, path: &str, old_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::bare(id, path, EditKind::Delete)
        }
    }

    /// The operation that undoes this one once it has succeeded.
    pub fn inverse(&self) -> Self {
        let mut inverse = self.clone();
        inverse.id = format!("{}~inverse", self.id);
        match self.kind {
            EditKind::Replace => {
                inverse.old_value = self.new_value.clone();
                inverse.new_value = self.old_value.clone();
            }
            EditKind::Insert => {
                inverse.kind = EditKind::Delete;
                inverse.old_value = self.new_value.clone();
                inverse.new_value = None;
            }
            EditKind::Delete => {
                inverse.kind = EditKind::Insert;
                inverse.new_value = self.old_value.clone();
                inverse.old_value = None;
            }
        }
        inverse
    }

    /// Checks the structural contract of the operation itself, independent of
    /// the document it will be applied to.
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        let missing = match self.kind {
            EditKind::Replace if self.old_value.is_none() => Some("oldValue"),
            EditKind::Replace | EditKind::Insert if self.new_value.is_none() => Some("newValue"),
            EditKind::Delete if self.old_value.is_none() => Some("oldValue"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(ShapeError::MissingValue {
                id: self.id.clone(),
                kind: self.kind.as_str(),
                field,
            });
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ShapeError::ConfidenceOutOfRange {
                    id: self.id.clone(),
                    confidence,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("operation {id}: {kind} requires {field}")]
    MissingValue {
        id: String,
        kind: &'static str,
        field: &'static str,
    },

    #[error("operation {id}: confidence {confidence} is outside [0, 1]")]
    ConfidenceOutOfRange { id: String, confidence: f64 },

    #[error("operation id '{0}' appears more than once in the batch")]
    DuplicateId(String),
}

impl ShapeError {
    pub fn code(&self) -> &'static str {
        match self {
            ShapeError::MissingValue { .. } => "missing_value",
            ShapeError::ConfidenceOutOfRange { .. } => "confidence_out_of_range",
            ShapeError::DuplicateId(_) => "duplicate_id",
        }
    }
}

/// Validates a whole batch: each operation's shape, then id uniqueness.
pub fn check_batch(ops: &[Suggestion]) -> Result<(), ShapeError> {
    let mut seen = HashSet::new();
    for op in ops {
        op.check_shape()?;
        if !seen.insert(op.id.as_str()) {
            return Err(ShapeError::DuplicateId(op.id.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchBatch {
    pub patch: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionSet {
    pub questions: Vec<String>,
}

/// Wire envelope from the suggestion collaborator: either edits or
/// clarifying questions, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchEnvelope {
    Patch(PatchBatch),
    Questions(QuestionSet),
}

impl PatchEnvelope {
    pub fn patch(&self) -> Option<&[Suggestion]> {
        match self {
            PatchEnvelope::Patch(batch) => Some(&batch.patch),
            PatchEnvelope::Questions(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_new_value_counts_as_present() {
        let op: Suggestion = serde_json::from_value(json!({
            "id": "1",
            "path": "/summary",
            "kind": "insert",
            "newValue": null,
            "rationale": "r",
            "provenance": "from_user"
        }))
        .unwrap();
        assert_eq!(op.new_value, Some(Value::Null));
        assert!(op.check_shape().is_ok());
    }

    #[test]
    fn test_absent_new_value_is_none() {
        let op: Suggestion = serde_json::from_value(json!({
            "id": "1",
            "path": "/summary",
            "kind": "replace",
            "oldValue": "",
            "rationale": "r",
            "provenance": "from_resume"
        }))
        .unwrap();
        assert_eq!(op.new_value, None);
        let err = op.check_shape().unwrap_err();
        assert_eq!(err.code(), "missing_value");
        assert!(err.to_string().contains("newValue"));
    }

    #[test]
    fn test_delete_requires_old_value() {
        let mut op = Suggestion::delete("d", "/skills/0", json!("TS"));
        assert!(op.check_shape().is_ok());
        op.old_value = None;
        assert!(op.check_shape().is_err());
    }

    #[test]
    fn test_replace_requires_both_values() {
        let mut op = Suggestion::replace("r", "/summary", json!(""), json!("A"));
        assert!(op.check_shape().is_ok());
        op.old_value = None;
        assert!(matches!(
            op.check_shape(),
            Err(ShapeError::MissingValue { field: "oldValue", .. })
        ));
    }

    #[test]
    fn test_confidence_bounds() {
        let mut op = Suggestion::insert("i", "/skills/0", json!("Rust"));
        op.confidence = Some(1.5);
        assert_eq!(op.check_shape().unwrap_err().code(), "confidence_out_of_range");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let ops = vec![
            Suggestion::insert("a", "/skills/0", json!("Rust")),
            Suggestion::insert("a", "/skills/1", json!("Go")),
        ];
        assert_eq!(check_batch(&ops), Err(ShapeError::DuplicateId("a".into())));
    }

    #[test]
    fn test_unknown_operation_field_rejected() {
        let raw = json!({
            "id": "1",
            "path": "/summary",
            "kind": "insert",
            "newValue": "x",
            "rationale": "r",
            "provenance": "from_user",
            "extra": true
        });
        assert!(serde_json::from_value::<Suggestion>(raw).is_err());
    }

    #[test]
    fn test_missing_rationale_rejected() {
        let raw = json!({
            "id": "1",
            "path": "/summary",
            "kind": "insert",
            "newValue": "x",
            "provenance": "from_user"
        });
        assert!(serde_json::from_value::<Suggestion>(raw).is_err());
    }

    #[test]
    fn test_priority_wire_format() {
        let mut op = Suggestion::insert("i", "/skills/0", json!("Rust"));
        op.priority = Some(Priority::Medium);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["priority"], json!(2));
        let bad = json!({
            "id": "1", "path": "/a", "kind": "insert", "newValue": 1,
            "rationale": "", "provenance": "from_jd", "priority": 4
        });
        assert!(serde_json::from_value::<Suggestion>(bad).is_err());
    }

    #[test]
    fn test_envelope_variants() {
        let patch: PatchEnvelope = serde_json::from_value(json!({
            "patch": [{
                "id": "1", "path": "/summary", "kind": "replace",
                "oldValue": "", "newValue": "A",
                "rationale": "r", "provenance": "from_user"
            }]
        }))
        .unwrap();
        assert_eq!(patch.patch().map(|p| p.len()), Some(1));

        let questions: PatchEnvelope =
            serde_json::from_value(json!({ "questions": ["Which role?"] })).unwrap();
        assert!(questions.patch().is_none());

        assert!(serde_json::from_value::<PatchEnvelope>(json!({ "patch": [], "questions": [] }))
            .is_err());
    }

    #[test]
    fn test_inverse_swaps_kinds() {
        let insert = Suggestion::insert("i", "/skills/0", json!("TS"));
        let inverse = insert.inverse();
        assert_eq!(inverse.kind, EditKind::Delete);
        assert_eq!(inverse.old_value, Some(json!("TS")));
        assert!(inverse.check_shape().is_ok());

        let replace = Suggestion::replace("r", "/summary", json!("a"), json!("b"));
        let inverse = replace.inverse();
        assert_eq!(inverse.old_value, Some(json!("b")));
        assert_eq!(inverse.new_value, Some(json!("a")));
    }
}
