//! Closed-schema validation of a candidate resume.
//!
//! The validator walks a dynamic `serde_json::Value` rather than the typed
//! model so that missing required fields and unknown properties are observed
//! instead of being papered over by serde defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::resume::Resume;
use crate::patch::pointer::escape;

/// `YYYY-MM` with month 01–12, or the literal `Present`.
pub static DATE_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]{4}-(?:0[1-9]|1[0-2])|Present)$").expect("date grammar regex")
});

pub fn is_valid_date(value: &str) -> bool {
    DATE_GRAMMAR.is_match(value)
}

/// A single schema violation: where, and what is wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldRule {
    /// Plain string, optionally with a minimum length in characters.
    Text { min_len: usize },
    Date,
    TextList { min_len: usize },
    Object(&'static ObjectRule),
    ObjectList(&'static ObjectRule),
}

#[derive(Debug)]
struct ObjectRule {
    fields: &'static [(&'static str, FieldRule)],
    required: &'static [&'static str],
}

const TEXT: FieldRule = FieldRule::Text { min_len: 0 };
const TEXT_LIST: FieldRule = FieldRule::TextList { min_len: 0 };

static BASICS: ObjectRule = ObjectRule {
    fields: &[
        ("name", FieldRule::Text { min_len: 1 }),
        ("label", FieldRule::Text { min_len: 1 }),
        ("email", FieldRule::Text { min_len: 3 }),
        ("phone", FieldRule::Text { min_len: 3 }),
        ("location", TEXT),
        ("links", FieldRule::TextList { min_len: 1 }),
    ],
    required: &["name", "label", "email", "phone"],
};

static WORK: ObjectRule = ObjectRule {
    fields: &[
        ("position", TEXT),
        ("company", TEXT),
        ("location", TEXT),
        ("startDate", FieldRule::Date),
        ("endDate", FieldRule::Date),
        ("bullets", TEXT_LIST),
    ],
    required: &["position", "company", "location", "startDate", "endDate", "bullets"],
};

static PROJECT: ObjectRule = ObjectRule {
    fields: &[
        ("name", TEXT),
        ("startDate", FieldRule::Date),
        ("endDate", FieldRule::Date),
        ("link", FieldRule::Text { min_len: 1 }),
        ("bullets", TEXT_LIST),
    ],
    required: &["name", "startDate", "bullets"],
};

static EDUCATION: ObjectRule = ObjectRule {
    fields: &[
        ("institution", TEXT),
        ("studyType", TEXT),
        ("area", TEXT),
        ("startDate", FieldRule::Date),
        ("endDate", FieldRule::Date),
        ("notes", TEXT),
    ],
    required: &["institution", "studyType", "area", "startDate", "endDate"],
};

static RESUME: ObjectRule = ObjectRule {
    fields: &[
        ("basics", FieldRule::Object(&BASICS)),
        ("summary", TEXT),
        ("skills", TEXT_LIST),
        ("work", FieldRule::ObjectList(&WORK)),
        ("projects", FieldRule::ObjectList(&PROJECT)),
        ("education", FieldRule::ObjectList(&EDUCATION)),
        ("certs", TEXT_LIST),
    ],
    required: &["basics", "skills", "work", "education"],
};

/// Validates a candidate document. Collects every violation rather than
/// stopping at the first one.
pub fn validate(document: &Value) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check_object(document, &RESUME, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

pub fn validate_resume(resume: &Resume) -> Result<(), Vec<Violation>> {
    validate(&resume.to_value())
}

fn check_object(value: &Value, rule: &ObjectRule, path: &str, out: &mut Vec<Violation>) {
    let Some(map) = value.as_object() else {
        out.push(Violation::new(path, "must be object"));
        return;
    };
    for required in rule.required {
        if !map.contains_key(*required) {
            out.push(Violation::new(
                path,
                format!("must have required property '{required}'"),
            ));
        }
    }
    check_properties(map, rule, path, out);
}

fn check_properties(
    map: &Map<String, Value>,
    rule: &ObjectRule,
    path: &str,
    out: &mut Vec<Violation>,
) {
    for (key, child) in map {
        let child_path = format!("{path}/{}", escape(key));
        match rule.fields.iter().find(|(name, _)| *name == key.as_str()) {
            Some((_, field)) => check_field(child, *field, &child_path, out),
            None => out.push(Violation::new(
                path,
                format!("must NOT have additional property '{key}'"),
            )),
        }
    }
}

fn check_field(value: &Value, rule: FieldRule, path: &str, out: &mut Vec<Violation>) {
    match rule {
        FieldRule::Text { min_len } => check_text(value, min_len, path, out),
        FieldRule::Date => match value.as_str() {
            Some(s) if is_valid_date(s) => {}
            Some(_) => out.push(Violation::new(path, "must be YYYY-MM or Present")),
            None => out.push(Violation::new(path, "must be string")),
        },
        FieldRule::TextList { min_len } => {
            let Some(items) = value.as_array() else {
                out.push(Violation::new(path, "must be array"));
                return;
            };
            for (index, item) in items.iter().enumerate() {
                check_text(item, min_len, &format!("{path}/{index}"), out);
            }
        }
        FieldRule::Object(object) => check_object(value, object, path, out),
        FieldRule::ObjectList(object) => {
            let Some(items) = value.as_array() else {
                out.push(Violation::new(path, "must be array"));
                return;
            };
            for (index, item) in items.iter().enumerate() {
                check_object(item, object, &format!("{path}/{index}"), out);
            }
        }
    }
}

fn check_text(value: &Value, min_len: usize, path: &str, out: &mut Vec<Violation>) {
    match value.as_str() {
        Some(s) if s.chars().count() < min_len => out.push(Violation::new(
            path,
            format!("must NOT have fewer than {min_len} characters"),
        )),
        Some(_) => {}
        None => out.push(Violation::new(path, "must be string")),
    }
}
