//! Scrubs contact details out of free text before it reaches a log line.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("email redaction regex")
});

static PHONE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("phone redaction regex"));

/// Longest excerpt [`log_excerpt`] will produce, in characters.
pub const MAX_EXCERPT_CHARS: usize = 120;

pub fn redact_pii(input: &str) -> String {
    let without_email = EMAIL.replace_all(input, "[redacted-email]");
    PHONE_RUN
        .replace_all(&without_email, "[redacted-phone]")
        .into_owned()
}

/// Redacted, single-line, truncated view of `input` for logging.
pub fn log_excerpt(input: &str) -> String {
    let redacted = redact_pii(input);
    let flat = redacted.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_EXCERPT_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_email_and_phone() {
        let out = redact_pii("Ada ada@example.com +44 20 1234 5678 London");
        assert_eq!(out, "Ada [redacted-email] [redacted-phone] London");
    }

    #[test]
    fn test_leaves_short_numbers_alone() {
        assert_eq!(redact_pii("Joined in 2019, team of 12"), "Joined in 2019, team of 12");
    }

    #[test]
    fn test_excerpt_truncates_and_flattens() {
        let long = "word\n".repeat(100);
        let out = log_excerpt(&long);
        assert!(!out.contains('\n'));
        assert_eq!(out.chars().count(), MAX_EXCERPT_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
