//! Editing sessions: one validated document, its lock policy and its
//! version log. All edits go through [`Session::apply`], which is the only
//! place locks, shape checks, the patch engine and revalidation meet.

pub mod handlers;
pub mod history;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::locks::LockPolicy;
use crate::models::resume::Resume;
use crate::models::suggestion::{check_batch, ShapeError, Suggestion};
use crate::patch::{
    apply_best_effort, apply_sequence, OperationError, OperationFailure, BATCH_ERROR_ID,
};
use crate::schema::{validate, validate_resume, Violation};

pub use history::{HistoryError, VersionLog, VersionSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    #[default]
    Atomic,
    BestEffort,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("operation {id} targets locked path {path}")]
    Locked { id: String, path: String },

    #[error(transparent)]
    Operation(#[from] OperationFailure),

    #[error("resulting document fails schema validation ({} violations)", .0.len())]
    SchemaInvalid(Vec<Violation>),
}

#[derive(Debug, Error)]
#[error("initial document fails schema validation ({} violations)", .0.len())]
pub struct InvalidDocument(pub Vec<Violation>);

/// What an apply call did. `version` is the current version id afterwards,
/// which only moves when the document actually changed.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub mode: ApplyMode,
    pub version: u64,
    pub changed: bool,
    pub applied: Vec<String>,
    pub errors: Vec<OperationFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    pub rolled_back: bool,
    pub document: Resume,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub current: u64,
    pub can_undo: bool,
    pub can_redo: bool,
    pub versions: Vec<VersionSummary>,
    pub redo: Vec<VersionSummary>,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    locks: LockPolicy,
    log: VersionLog,
}

impl Session {
    /// Opens a session on a document that must already satisfy the schema.
    pub fn new(document: Resume, locks: LockPolicy) -> Result<Self, InvalidDocument> {
        validate_resume(&document).map_err(InvalidDocument)?;
        let id = Uuid::new_v4();
        info!("Opened session {id} with {} lock patterns", locks.locked.len());
        Ok(Self {
            id,
            locks,
            log: VersionLog::new(document),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current(&self) -> &Resume {
        &self.log.current().document
    }

    pub fn version(&self) -> u64 {
        self.log.current().id
    }

    pub fn locks(&self) -> &LockPolicy {
        &self.locks
    }

    pub fn set_locks(&mut self, locks: LockPolicy) {
        info!(
            "Session {} lock policy now {} locked, {} unlocked",
            self.id,
            locks.locked.len(),
            locks.unlocked.len()
        );
        self.locks = locks;
    }

    pub fn lock_state(&self, path: &str) -> bool {
        self.locks.is_locked(path)
    }

    /// Drops operations that target locked paths. Used to sanitize proposals
    /// before they are shown; returns (kept, blocked).
    pub fn filter_locked(&self, ops: Vec<Suggestion>) -> (Vec<Suggestion>, Vec<Suggestion>) {
        self.locks.partition(ops)
    }

    pub fn apply(&mut self, ops: &[Suggestion], mode: ApplyMode) -> Result<ApplyReport, ApplyError> {
        check_batch(ops)?;
        match mode {
            ApplyMode::Atomic => self.apply_atomic(ops),
            ApplyMode::BestEffort => Ok(self.apply_best_effort(ops)),
        }
    }

    fn apply_atomic(&mut self, ops: &[Suggestion]) -> Result<ApplyReport, ApplyError> {
        if let Some(op) = ops.iter().find(|op| self.locks.is_locked(&op.path)) {
            return Err(ApplyError::Locked {
                id: op.id.clone(),
                path: op.path.clone(),
            });
        }

        let next = apply_sequence(&self.current().to_value(), ops)?;
        validate(&next).map_err(ApplyError::SchemaInvalid)?;
        let document = Resume::from_value(next)
            .map_err(|e| ApplyError::SchemaInvalid(vec![Violation::new("/", e.to_string())]))?;

        let changed = self.commit(document);
        Ok(ApplyReport {
            mode: ApplyMode::Atomic,
            version: self.version(),
            changed,
            applied: ops.iter().map(|op| op.id.clone()).collect(),
            errors: Vec::new(),
            violations: Vec::new(),
            rolled_back: false,
            document: self.current().clone(),
        })
    }

    fn apply_best_effort(&mut self, ops: &[Suggestion]) -> ApplyReport {
        let (allowed, blocked) = self.locks.partition(ops.to_vec());
        let mut outcome = apply_best_effort(&self.current().to_value(), &allowed);

        let mut errors: Vec<OperationFailure> = blocked
            .iter()
            .map(|op| OperationFailure::new(&op.id, OperationError::Locked))
            .collect();
        errors.append(&mut outcome.errors);
        let position = |id: &str| {
            ops.iter()
                .position(|op| op.id == id)
                .unwrap_or(ops.len())
        };
        errors.sort_by_key(|failure| {
            if failure.id == BATCH_ERROR_ID {
                ops.len() + 1
            } else {
                position(&failure.id)
            }
        });

        let mut violations = outcome.violations;
        let mut rolled_back = outcome.rolled_back;
        let mut applied = outcome.applied;
        let mut changed = false;
        if !rolled_back {
            match Resume::from_value(outcome.document) {
                Ok(document) => changed = self.commit(document),
                Err(e) => {
                    violations = vec![Violation::new("/", e.to_string())];
                    errors.push(OperationFailure::new(BATCH_ERROR_ID, OperationError::SchemaInvalid));
                    applied.clear();
                    rolled_back = true;
                }
            }
        }

        debug!(
            "Session {} best-effort: {} applied, {} failed, rolled_back={rolled_back}",
            self.id,
            applied.len(),
            errors.len()
        );
        ApplyReport {
            mode: ApplyMode::BestEffort,
            version: self.version(),
            changed,
            applied,
            errors,
            violations,
            rolled_back,
            document: self.current().clone(),
        }
    }

    /// Records `document` as a new version unless it equals the current one.
    fn commit(&mut self, document: Resume) -> bool {
        if &document == self.current() {
            return false;
        }
        let id = self.log.record(document).id;
        info!("Session {} recorded version {id}", self.id);
        true
    }

    pub fn undo(&mut self) -> Result<&Resume, HistoryError> {
        let entry = self.log.undo()?;
        info!("Session {} undo to version {}", self.id, entry.id);
        Ok(&entry.document)
    }

    pub fn redo(&mut self) -> Result<&Resume, HistoryError> {
        let entry = self.log.redo()?;
        info!("Session {} redo to version {}", self.id, entry.id);
        Ok(&entry.document)
    }

    pub fn history(&self) -> HistoryView {
        HistoryView {
            current: self.version(),
            can_undo: self.log.can_undo(),
            can_redo: self.log.can_redo(),
            versions: self.log.past_and_current(),
            redo: self.log.redoable(),
        }
    }
}
