use serde::{Deserialize, Serialize};

/// Text extracted from one page of an uploaded file. Extraction itself
/// (PDF, DOCX, OCR) happens outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// Zero-based page index.
    pub index: usize,
    #[serde(default)]
    pub text: Option<String>,
}

/// Joins per-page text into one document, each page preceded by a
/// `===== Page N =====` separator (1-based).
pub fn assemble_raw_text(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| {
            format!(
                "\n\n===== Page {} =====\n{}",
                page.index + 1,
                page.text.as_deref().unwrap_or_default()
            )
        })
        .collect()
}
