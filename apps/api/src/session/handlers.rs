use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::{diagnose, Diagnosis, RolePreset};
use crate::collaborator::{suggest_checked, SuggestMode, SuggestRequest};
use crate::errors::AppError;
use crate::locks::LockPolicy;
use crate::models::resume::Resume;
use crate::models::suggestion::{PatchEnvelope, Suggestion};
use crate::session::{ApplyMode, ApplyReport, HistoryView, Session};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub version: u64,
    pub resume: Resume,
    pub locks: LockPolicy,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        let history = session.history();
        Self {
            id: session.id(),
            version: session.version(),
            resume: session.current().clone(),
            locks: session.locks().clone(),
            can_undo: history.can_undo,
            can_redo: history.can_redo,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub resume: Resume,
    /// Replaces the configured default lock patterns when present.
    #[serde(default)]
    pub locked: Option<Vec<String>>,
    #[serde(default)]
    pub unlocked: Vec<String>,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>), AppError> {
    let locked = req
        .locked
        .unwrap_or_else(|| state.config.default_locked_paths.clone());
    let session = Session::new(req.resume, LockPolicy::new(locked, req.unlocked))?;
    let summary = SessionSummary::from(&session);
    state.insert_session(session).await;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionSummary::from(&*session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.remove_session(id).await?;
    info!("Closed session {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/history
pub async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryView>, AppError> {
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(session.history()))
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub patch: Vec<Suggestion>,
    #[serde(default)]
    pub mode: ApplyMode,
}

/// POST /api/v1/sessions/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<ApplyReport>, AppError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    let report = session.apply(&req.patch, req.mode)?;
    info!(
        "Session {id} applied {}/{} ops ({:?}), version {}",
        report.applied.len(),
        req.patch.len(),
        req.mode,
        report.version
    );
    Ok(Json(report))
}

/// POST /api/v1/sessions/:id/undo
pub async fn handle_undo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    session.undo()?;
    Ok(Json(SessionSummary::from(&*session)))
}

/// POST /api/v1/sessions/:id/redo
pub async fn handle_redo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    session.redo()?;
    Ok(Json(SessionSummary::from(&*session)))
}

/// PUT /api/v1/sessions/:id/locks
pub async fn handle_set_locks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(locks): Json<LockPolicy>,
) -> Result<Json<SessionSummary>, AppError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    session.set_locks(locks);
    Ok(Json(SessionSummary::from(&*session)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestBody {
    pub mode: SuggestMode,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub jd_text: Option<String>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<Suggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    /// Ids of proposed operations withheld because they target locked paths.
    pub blocked: Vec<String>,
}

/// POST /api/v1/sessions/:id/suggest
pub async fn handle_suggest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SuggestBody>,
) -> Result<Json<SuggestResponse>, AppError> {
    let collaborator = state.collaborator()?;
    let handle = state.session(id).await?;

    // The session stays unlocked while the collaborator works.
    let resume = handle.lock().await.current().clone();
    let request = SuggestRequest {
        mode: body.mode,
        resume,
        instruction: body.instruction,
        jd_text: body.jd_text,
    };
    let envelope = suggest_checked(collaborator, &request).await?;

    let response = match envelope {
        PatchEnvelope::Patch(batch) => {
            let (kept, blocked) = handle.lock().await.filter_locked(batch.patch);
            info!(
                "Session {id} received {} suggestions, {} blocked by locks",
                kept.len() + blocked.len(),
                blocked.len()
            );
            SuggestResponse {
                patch: Some(kept),
                questions: None,
                blocked: blocked.into_iter().map(|op| op.id).collect(),
            }
        }
        PatchEnvelope::Questions(set) => SuggestResponse {
            patch: None,
            questions: Some(set.questions),
            blocked: Vec::new(),
        },
    };
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct DiagnoseRequest {
    pub role: RolePreset,
}

/// POST /api/v1/sessions/:id/diagnose
pub async fn handle_diagnose(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DiagnoseRequest>,
) -> Result<Json<Diagnosis>, AppError> {
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(diagnose(session.current(), req.role)))
}
