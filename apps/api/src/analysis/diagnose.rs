use serde::{Deserialize, Serialize};

use crate::models::resume::Resume;
use crate::schema::is_valid_date;

/// Target role presets a diagnosis can be tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolePreset {
    #[serde(rename = "PM")]
    Pm,
    #[serde(rename = "AI PM")]
    AiPm,
    #[serde(rename = "AI Eng")]
    AiEng,
    #[serde(rename = "Full-stack")]
    FullStack,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub quick_wins: Vec<String>,
}

const SOLID_COVERAGE_BULLETS: usize = 8;

const AI_STACK_KEYWORDS: &[&str] = &["python", "pytorch", "rag", "vector", "faiss"];

const EXPERIMENTATION_KEYWORDS: &[&str] = &["a/b testing", "experiments"];

/// Quick read of a resume against a role preset.
///
/// Skill matching is case-insensitive and exact per skill entry.
pub fn diagnose(resume: &Resume, role: RolePreset) -> Diagnosis {
    let mut diagnosis = Diagnosis::default();
    let skills: Vec<String> = resume.skills.iter().map(|s| s.to_lowercase()).collect();
    let has_skill = |needle: &str| skills.iter().any(|s| s == needle);

    let bullet_count: usize = resume.work.iter().map(|w| w.bullets.len()).sum();
    if bullet_count >= SOLID_COVERAGE_BULLETS {
        diagnosis.strengths.push("Solid experience coverage".into());
    }
    if !resume.summary.is_empty() {
        diagnosis.strengths.push("Has a focused summary".into());
    }

    match role {
        RolePreset::AiEng => {
            if AI_STACK_KEYWORDS.iter().any(|k| has_skill(k)) {
                diagnosis.strengths.push("AI stack keywords present".into());
            }
            if !has_skill("rag") {
                diagnosis.gaps.push("Add RAG if applicable".into());
            }
            diagnosis
                .quick_wins
                .push("Quantify at least 3 bullets with metric + tool".into());
        }
        RolePreset::Pm | RolePreset::AiPm => {
            if !EXPERIMENTATION_KEYWORDS.iter().any(|k| has_skill(k)) {
                diagnosis.gaps.push("Add experimentation skills".into());
            }
            diagnosis
                .quick_wins
                .push("Shorten summary to ≤ 2 lines with focus on outcomes".into());
        }
        RolePreset::FullStack => {
            if !has_skill("typescript") {
                diagnosis.gaps.push("Surface TypeScript if relevant".into());
            }
            diagnosis
                .quick_wins
                .push("Ensure recent project lists stack (Node/React)".into());
        }
    }

    let dates_valid = resume
        .work
        .iter()
        .all(|w| is_valid_date(&w.start_date) && is_valid_date(&w.end_date));
    if !dates_valid {
        diagnosis.gaps.push("Normalize dates to YYYY-MM or Present".into());
    }

    diagnosis
}
