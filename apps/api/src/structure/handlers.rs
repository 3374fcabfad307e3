use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::log_excerpt;
use crate::collaborator::structure_remote;
use crate::errors::AppError;
use crate::models::flags::Flag;
use crate::models::resume::Resume;
use crate::normalize::{normalize, Normalized};
use crate::schema::{validate, Violation};
use crate::state::AppState;
use crate::structure::{assemble_raw_text, structure_heuristically, DroppedItems, PageText};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRequest {
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<PageText>>,
    /// Ask the collaborator when the heuristic result is flagged incomplete.
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSource {
    Heuristic,
    Collaborator,
}

#[derive(Serialize)]
pub struct StructureResponse {
    pub resume: Resume,
    pub flags: Vec<Flag>,
    pub dropped: DroppedItems,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    pub source: StructureSource,
}

impl StructureRequest {
    fn into_raw_text(self) -> Result<String, AppError> {
        match (self.raw_text, self.pages) {
            (Some(text), _) => Ok(text),
            (None, Some(pages)) => Ok(assemble_raw_text(&pages)),
            (None, None) => Err(AppError::Validation(
                "either rawText or pages is required".to_string(),
            )),
        }
    }
}

/// POST /api/v1/structure
pub async fn handle_structure(
    State(state): State<AppState>,
    Json(req): Json<StructureRequest>,
) -> Result<Json<StructureResponse>, AppError> {
    let fallback = req.fallback;
    let raw_text = req.into_raw_text()?;
    info!(
        "Structuring {} chars: {}",
        raw_text.chars().count(),
        log_excerpt(&raw_text)
    );

    let result = structure_heuristically(&raw_text);
    if !(fallback && result.is_incomplete()) {
        return Ok(Json(StructureResponse {
            valid: result.violations.is_empty(),
            resume: result.resume,
            flags: result.flags,
            dropped: result.dropped,
            violations: result.violations,
            source: StructureSource::Heuristic,
        }));
    }

    warn!(
        "Heuristic structuring incomplete ({} items dropped), asking collaborator",
        result.dropped.total()
    );
    let (resume, flags) = structure_remote(state.collaborator()?, &raw_text).await?;
    Ok(Json(StructureResponse {
        resume,
        flags,
        dropped: DroppedItems::default(),
        valid: true,
        violations: Vec::new(),
        source: StructureSource::Collaborator,
    }))
}

#[derive(Deserialize)]
pub struct ResumeBody<T> {
    pub resume: T,
}

/// POST /api/v1/normalize
pub async fn handle_normalize(Json(req): Json<ResumeBody<Resume>>) -> Json<Normalized> {
    Json(normalize(&req.resume))
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub ok: bool,
    pub errors: Vec<Violation>,
}

/// POST /api/v1/validate
/// Accepts any JSON so that closed-schema violations can be reported.
pub async fn handle_validate(Json(req): Json<ResumeBody<Value>>) -> Json<ValidateResponse> {
    let errors = validate(&req.resume).err().unwrap_or_default();
    Json(ValidateResponse {
        ok: errors.is_empty(),
        errors,
    })
}
