use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::collaborator::CollaboratorError;
use crate::schema::Violation;
use crate::session::{ApplyError, HistoryError, InvalidDocument};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schema invalid")]
    SchemaInvalid(Vec<Violation>),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("No collaborator is configured")]
    CollaboratorUnavailable,
}

impl From<InvalidDocument> for AppError {
    fn from(e: InvalidDocument) -> Self {
        AppError::SchemaInvalid(e.0)
    }
}

fn violation_details(violations: &[Violation]) -> Value {
    json!({ "violations": violations })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::SchemaInvalid(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SCHEMA_INVALID",
                self.to_string(),
                Some(violation_details(violations)),
            ),
            AppError::Apply(e) => {
                let (code, details) = match e {
                    ApplyError::Shape(shape) => (shape.code(), None),
                    ApplyError::Locked { id, path } => {
                        ("locked", Some(json!({ "id": id, "path": path })))
                    }
                    ApplyError::Operation(failure) => (
                        failure.error.code(),
                        Some(json!({ "id": failure.id })),
                    ),
                    ApplyError::SchemaInvalid(violations) => {
                        ("schema_invalid", Some(violation_details(violations)))
                    }
                };
                let status = match e {
                    ApplyError::Shape(_) => StatusCode::BAD_REQUEST,
                    ApplyError::Locked { .. } => StatusCode::CONFLICT,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, code, e.to_string(), details)
            }
            AppError::History(e) => (StatusCode::CONFLICT, "HISTORY_EMPTY", e.to_string(), None),
            AppError::Collaborator(e) => {
                tracing::error!("Collaborator error: {e}");
                let details = match e {
                    CollaboratorError::InvalidResume(violations) => {
                        Some(violation_details(violations))
                    }
                    _ => None,
                };
                (
                    StatusCode::BAD_GATEWAY,
                    "COLLABORATOR_ERROR",
                    "The structuring service failed".to_string(),
                    details,
                )
            }
            AppError::CollaboratorUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "COLLABORATOR_UNAVAILABLE",
                self.to_string(),
                None,
            ),
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
