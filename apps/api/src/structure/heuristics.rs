//! Heuristic Structurer — raw resume text to a candidate document.
//!
//! Pattern-only segmentation: section headings slice the text, the header zone
//! yields contact basics, and experience/education blocks are parsed one by
//! one. Work and education items are only emitted when every required field
//! resolved; everything else is counted as dropped. The candidate is then
//! canonicalized and validated, and `heuristics_incomplete` tells the caller
//! to escalate to an external structuring pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::flags::{raise, Flag};
use crate::models::resume::{Basics, EducationEntry, Resume, WorkEntry, PRESENT};
use crate::normalize::normalize;
use crate::schema::{validate_resume, Violation};
use crate::structure::patterns::{
    BLOCK_SEPARATOR, BULLET_LINE, DATE_TOKEN, EMAIL, HEADER_SEPARATOR, LINK, LOCATION,
    MIN_PHONE_DIGITS, PAGE_MARKER, PHONE, ROLE_TITLE, SECTION_HEADING, SKILL_SEPARATOR,
};

/// Header zone size when the text has no recognizable heading.
const HEADER_ZONE_FALLBACK_CHARS: usize = 2000;
const MAX_BULLETS_PER_BLOCK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SectionKind {
    Experience,
    Work,
    Projects,
    Education,
    Skills,
    Summary,
}

impl SectionKind {
    fn from_heading(heading: &str) -> Option<Self> {
        match heading.to_ascii_lowercase().as_str() {
            "experience" => Some(SectionKind::Experience),
            "work" => Some(SectionKind::Work),
            "projects" => Some(SectionKind::Projects),
            "education" => Some(SectionKind::Education),
            "skills" => Some(SectionKind::Skills),
            "summary" => Some(SectionKind::Summary),
            _ => None,
        }
    }
}

/// Counts of blocks discarded by the completeness gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedItems {
    pub work: usize,
    pub education: usize,
}

impl DroppedItems {
    pub fn total(&self) -> usize {
        self.work + self.education
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureResult {
    pub resume: Resume,
    pub flags: Vec<Flag>,
    pub dropped: DroppedItems,
    /// Violations of the canonicalized candidate; empty when it is acceptable.
    pub violations: Vec<Violation>,
}

impl StructureResult {
    pub fn is_incomplete(&self) -> bool {
        self.flags.contains(&Flag::HeuristicsIncomplete)
    }
}

struct Sections<'a> {
    chunks: HashMap<SectionKind, String>,
    header_zone: &'a str,
}

impl Sections<'_> {
    fn get(&self, kind: SectionKind) -> Option<&str> {
        self.chunks.get(&kind).map(String::as_str)
    }
}

pub fn structure_heuristically(raw_text: &str) -> StructureResult {
    let text = clean_text(raw_text);
    let sections = split_by_sections(&text);

    let mut resume = Resume {
        basics: extract_basics(sections.header_zone, &text),
        ..Default::default()
    };

    if let Some(summary) = sections.get(SectionKind::Summary) {
        resume.summary = summary.to_string();
    }

    if let Some(skills) = sections.get(SectionKind::Skills) {
        resume.skills = SKILL_SEPARATOR
            .split(skills)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    let mut dropped = DroppedItems::default();

    let work_text = [SectionKind::Experience, SectionKind::Work]
        .into_iter()
        .filter_map(|kind| sections.get(kind))
        .collect::<Vec<_>>()
        .join("\n\n");
    for block in split_blocks(&work_text) {
        let entry = parse_work_block(block);
        if entry.is_complete() {
            resume.work.push(entry);
        } else {
            dropped.work += 1;
        }
    }

    if let Some(education) = sections.get(SectionKind::Education) {
        for block in split_blocks(education) {
            let entry = parse_education_block(block);
            if entry.is_complete() {
                resume.education.push(entry);
            } else {
                dropped.education += 1;
            }
        }
    }

    let normalized = normalize(&resume);
    let mut flags = normalized.flags;
    if dropped.total() > 0 {
        debug!(
            "Completeness gate dropped {} work and {} education blocks",
            dropped.work, dropped.education
        );
        raise(&mut flags, Flag::IncompleteItemsDropped);
        raise(&mut flags, Flag::HeuristicsIncomplete);
    }
    let violations = match validate_resume(&normalized.resume) {
        Ok(()) => Vec::new(),
        Err(violations) => {
            raise(&mut flags, Flag::HeuristicsIncomplete);
            violations
        }
    };

    StructureResult {
        resume: normalized.resume,
        flags,
        dropped,
        violations,
    }
}

/// Unifies line endings and removes page separators.
fn clean_text(raw_text: &str) -> String {
    let text = raw_text.replace("\r\n", "\n").replace('\r', "\n");
    PAGE_MARKER.replace_all(&text, "").into_owned()
}

fn split_by_sections(text: &str) -> Sections<'_> {
    let headings: Vec<(SectionKind, usize, usize)> = SECTION_HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = SectionKind::from_heading(caps.get(1)?.as_str())?;
            Some((kind, whole.start(), whole.end()))
        })
        .collect();

    let mut chunks: HashMap<SectionKind, String> = HashMap::new();
    for (i, (kind, _, body_start)) in headings.iter().enumerate() {
        let body_end = headings
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(text.len());
        let body = &text[*body_start..body_end];
        chunks
            .entry(*kind)
            .and_modify(|existing| {
                existing.push_str("\n\n");
                existing.push_str(body);
            })
            .or_insert_with(|| body.to_string());
    }

    let header_end = match headings.first() {
        Some((_, start, _)) => *start,
        None => text
            .char_indices()
            .nth(HEADER_ZONE_FALLBACK_CHARS)
            .map(|(i, _)| i)
            .unwrap_or(text.len()),
    };

    Sections {
        chunks,
        header_zone: &text[..header_end],
    }
}

fn extract_basics(header_zone: &str, text: &str) -> Basics {
    let header_lines: Vec<&str> = header_zone
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let name = header_lines.first().copied().unwrap_or_default();
    let label = header_lines
        .iter()
        .find(|line| ROLE_TITLE.is_match(line))
        .copied()
        .or_else(|| ROLE_TITLE.find(text).map(|m| m.as_str()))
        .unwrap_or_default();

    let email = EMAIL
        .find(header_zone)
        .or_else(|| EMAIL.find(text))
        .map(|m| m.as_str())
        .unwrap_or_default();

    let phone = find_phone(header_zone)
        .or_else(|| find_phone(text))
        .unwrap_or_default();

    let mut links = find_links(header_zone);
    if links.is_empty() {
        links = find_links(text);
    }

    Basics {
        name: name.to_string(),
        label: label.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        location: None,
        links,
    }
}

fn find_phone(zone: &str) -> Option<&str> {
    PHONE
        .find_iter(zone)
        .map(|m| m.as_str().trim())
        .find(|candidate| candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
}

fn find_links(zone: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for m in LINK.find_iter(zone) {
        let link = m.as_str().trim_end_matches(['.', ':']);
        if !link.is_empty() && !links.iter().any(|l| l == link) {
            links.push(link.to_string());
        }
    }
    links
}

fn split_blocks(section: &str) -> impl Iterator<Item = &str> {
    BLOCK_SEPARATOR
        .split(section)
        .map(str::trim)
        .filter(|b| !b.is_empty())
}

/// A block split into its bullet texts (capped) and its remaining lines.
struct Block<'a> {
    bullets: Vec<String>,
    lines: Vec<&'a str>,
}

fn peel_bullets(block: &str) -> Block<'_> {
    let mut bullets = Vec::new();
    let mut lines = Vec::new();
    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match BULLET_LINE.captures(line).and_then(|caps| caps.get(1)) {
            Some(text) => {
                if bullets.len() < MAX_BULLETS_PER_BLOCK {
                    bullets.push(text.as_str().trim().to_string());
                }
            }
            None => lines.push(line),
        }
    }
    Block { bullets, lines }
}

/// Splits an entry header such as `Acme Corp — Berlin` into company and
/// location. The location is only taken when the trailing part looks like a
/// place name.
fn split_header(header: &str) -> (String, String) {
    let parts: Vec<&str> = HEADER_SEPARATOR
        .split(header)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let company = parts.first().copied().unwrap_or_default().to_string();
    let location = match parts.as_slice() {
        [_, .., last] if LOCATION.is_match(last) => last.to_string(),
        _ => String::new(),
    };
    (company, location)
}

/// First two distinct date tokens in the block: start, then end (`Present`
/// when only one was found). Both empty when the block has no date at all.
fn guess_dates(block: &str) -> (String, String) {
    let mut tokens: Vec<String> = Vec::new();
    for caps in DATE_TOKEN.captures_iter(block) {
        let token = match (caps.get(1), caps.get(2)) {
            (Some(year), Some(month)) => match month.as_str().parse::<u32>() {
                Ok(month) => format!("{}-{month:02}", year.as_str()),
                Err(_) => year.as_str().to_string(),
            },
            (Some(year), None) => format!("{}-01", year.as_str()),
            _ => PRESENT.to_string(),
        };
        if !tokens.contains(&token) {
            tokens.push(token);
        }
        if tokens.len() == 2 {
            break;
        }
    }
    let mut tokens = tokens.into_iter();
    match (tokens.next(), tokens.next()) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, PRESENT.to_string()),
        _ => (String::new(), String::new()),
    }
}

fn parse_work_block(block: &str) -> WorkEntry {
    let Block { bullets, lines } = peel_bullets(block);
    let (company, location) = lines.first().map(|h| split_header(h)).unwrap_or_default();
    let (start_date, end_date) = guess_dates(block);
    WorkEntry {
        // No extraction rule exists for the position title.
        position: String::new(),
        company,
        location,
        start_date,
        end_date,
        bullets,
    }
}

fn parse_education_block(block: &str) -> EducationEntry {
    let Block { lines, .. } = peel_bullets(block);
    let (start_date, end_date) = guess_dates(block);
    EducationEntry {
        institution: lines.first().copied().unwrap_or_default().to_string(),
        study_type: String::new(),
        area: String::new(),
        start_date,
        end_date,
        notes: None,
    }
}
