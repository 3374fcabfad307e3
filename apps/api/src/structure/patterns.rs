//! Named text patterns used by the heuristic structurer.
//!
//! Each pattern is compiled once and tested on its own below, independent of
//! the pipeline that composes them.

use once_cell::sync::Lazy;
use regex::Regex;

/// A line holding only a section heading, optionally followed by a colon.
pub static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(experience|work|projects|education|skills|summary)[ \t]*:?[ \t]*$")
        .expect("section heading regex")
});

/// A bulleted or numbered line; group 1 is the text after the marker.
pub static BULLET_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[•▪●◦‣*\-–]\s*|[0-9]{1,2}[.)]\s+)(\S.*)$").expect("bullet line regex")
});

/// A year with optional month, or a present-synonym.
pub static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]{4})(?:[-/]([0-9]{1,2}))?\b|\b(present|current|now)\b")
        .expect("date token regex")
});

pub static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}").expect("email regex")
});

/// Phone-like runs. Candidates must additionally carry at least
/// [`MIN_PHONE_DIGITS`] digits.
pub static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?[0-9][0-9\-\x20().]{5,}[0-9]").expect("phone regex"));

pub const MIN_PHONE_DIGITS: usize = 7;

/// Full URLs and scheme-less `site.tld/path` tokens.
pub static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bhttps?://[^\s,;()<>|]+|\b(?:[a-z0-9\-]+\.)+[a-z]{2,}/[^\s,;()<>|]*")
        .expect("link regex")
});

/// Known role titles accepted as the resume label.
pub static ROLE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(AI Product Manager|Product Manager|AI Engineer|Software Engineer|Data Scientist|Full[- ]stack(?: Developer| Engineer)?)",
    )
    .expect("role title regex")
});

/// Separators between the company and location parts of an entry header.
pub static HEADER_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[—–|·]\s*|\s+-\s+").expect("header separator regex"));

/// A trailing place name: capitalized words, optionally comma separated.
pub static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Remote|[A-Z][A-Za-z.]+(?:,?\s+[A-Z][A-Za-z.]+)*)$").expect("location regex")
});

/// One or more blank lines.
pub static BLOCK_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("block separator regex"));

pub static SKILL_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\n]").expect("skill separator regex"));

/// Page separators inserted by [`super::text::assemble_raw_text`].
pub static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^===== Page [0-9]+ =====[ \t]*$").expect("page marker regex"));
