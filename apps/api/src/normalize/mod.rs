//! Canonicalizer — deterministic, idempotent repair of a resume document.
//!
//! Rules, applied field by field:
//! - strings are trimmed (a blank string stays an empty string)
//! - skills, links, certs and bullets are de-duplicated after trimming, first
//!   occurrence wins, blanks removed
//! - `present` / `current` / `now` (any case) become the literal `Present`
//! - any other date outside the grammar is coerced to `YYYY-MM` and
//!   `weak_dates` is raised
//!
//! Running the canonicalizer on its own output changes nothing and raises no
//! flags.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::flags::{raise, Flag};
use crate::models::resume::{Resume, PRESENT};
use crate::schema::is_valid_date;

static PRESENT_SYNONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:present|current|now)$").expect("present synonym regex"));

static YEAR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{4}").expect("year regex"));

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{4}[-/]([0-9]{1,2})").expect("year-month regex"));

const DEFAULT_YEAR: &str = "2000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub resume: Resume,
    pub flags: Vec<Flag>,
}

/// Returns a canonical copy of `input`; the caller's value is untouched.
pub fn normalize(input: &Resume) -> Normalized {
    let mut flags = Vec::new();
    let mut resume = input.clone();

    let basics = &mut resume.basics;
    trim_in_place(&mut basics.name);
    trim_in_place(&mut basics.label);
    trim_in_place(&mut basics.email);
    trim_in_place(&mut basics.phone);
    if let Some(location) = basics.location.as_mut() {
        trim_in_place(location);
    }
    basics.links = dedupe_list(&basics.links, &mut flags);

    trim_in_place(&mut resume.summary);
    resume.skills = dedupe_list(&resume.skills, &mut flags);

    for work in &mut resume.work {
        trim_in_place(&mut work.position);
        trim_in_place(&mut work.company);
        trim_in_place(&mut work.location);
        work.start_date = canonical_date(&work.start_date, &mut flags);
        work.end_date = canonical_date(&work.end_date, &mut flags);
        work.bullets = dedupe_list(&work.bullets, &mut flags);
    }

    for project in &mut resume.projects {
        trim_in_place(&mut project.name);
        project.start_date = canonical_date(&project.start_date, &mut flags);
        project.end_date = project
            .end_date
            .as_deref()
            .map(|end| canonical_date(end, &mut flags));
        // A link, when present, must be non-empty; a blank one carries nothing.
        project.link = project
            .link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .map(String::from);
        project.bullets = dedupe_list(&project.bullets, &mut flags);
    }

    for education in &mut resume.education {
        trim_in_place(&mut education.institution);
        trim_in_place(&mut education.study_type);
        trim_in_place(&mut education.area);
        education.start_date = canonical_date(&education.start_date, &mut flags);
        education.end_date = canonical_date(&education.end_date, &mut flags);
        if let Some(notes) = education.notes.as_mut() {
            trim_in_place(notes);
        }
    }

    resume.certs = dedupe_list(&resume.certs, &mut flags);

    Normalized { resume, flags }
}

/// Maps a raw date onto the grammar. Present-synonyms map silently; anything
/// else outside the grammar is coerced and flagged.
pub fn canonical_date(raw: &str, flags: &mut Vec<Flag>) -> String {
    let trimmed = raw.trim();
    if PRESENT_SYNONYM.is_match(trimmed) {
        return PRESENT.to_string();
    }
    if is_valid_date(trimmed) {
        return trimmed.to_string();
    }
    raise(flags, Flag::WeakDates);
    coerce_date(trimmed)
}

/// Best-effort coercion that always yields a grammar-conforming `YYYY-MM`.
/// Year: first run of four digits, else 2000. Month: from a `YYYY-MM` or
/// `YYYY/M` shape when in 1..=12, else 01.
pub fn coerce_date(raw: &str) -> String {
    let year = YEAR_RUN
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_YEAR);
    let month = YEAR_MONTH
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|month| (1..=12).contains(month))
        .unwrap_or(1);
    format!("{year}-{month:02}")
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn dedupe_list(items: &[String], flags: &mut Vec<Flag>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed) {
            out.push(trimmed.to_string());
        } else {
            raise(flags, Flag::DuplicatesRemoved);
        }
    }
    out
}
