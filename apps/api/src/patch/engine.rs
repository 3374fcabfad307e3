//! Patch Engine — applies pointer-addressed edit operations to a document.
//!
//! Every entry point works on a private deep copy; the caller's value is never
//! observed to change. Each failure maps to a named [`OperationError`] code so
//! callers can render precise diagnostics.

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::models::suggestion::{EditKind, Suggestion};
use crate::patch::pointer::{parse_index, parse_pointer, ArrayIndex};
use crate::schema::{validate, Violation};

/// Operation id used for failures that belong to the batch as a whole.
pub const BATCH_ERROR_ID: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("a segment before the target does not resolve to a container")]
    PathNotFound,

    #[error("the target segment is not an array index")]
    ArrayIndexInvalid,

    #[error("array index is out of bounds")]
    IndexOutOfBounds,

    #[error("operation requires newValue")]
    MissingNewValue,

    #[error("key does not exist")]
    KeyNotFound,

    #[error("the target's parent is neither an object nor an array")]
    ParentNotContainer,

    #[error("the document root cannot be edited")]
    RootOperation,

    #[error("the resulting document fails schema validation")]
    SchemaInvalid,

    #[error("the target path is locked")]
    Locked,
}

impl OperationError {
    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            OperationError::PathNotFound => "path_not_found",
            OperationError::ArrayIndexInvalid => "array_index_invalid",
            OperationError::IndexOutOfBounds => "index_oob",
            OperationError::MissingNewValue => "missing_newValue",
            OperationError::KeyNotFound => "key_not_found",
            OperationError::ParentNotContainer => "parent_not_container",
            OperationError::RootOperation => "cannot operate on root",
            OperationError::SchemaInvalid => "schema_invalid",
            OperationError::Locked => "locked",
        }
    }
}

impl Serialize for OperationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// An [`OperationError`] attributed to the operation that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("operation {id}: {error}")]
pub struct OperationFailure {
    pub id: String,
    pub error: OperationError,
}

impl OperationFailure {
    pub fn new(id: impl Into<String>, error: OperationError) -> Self {
        Self {
            id: id.into(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestEffortOutcome {
    pub document: Value,
    pub errors: Vec<OperationFailure>,
    /// Ids of operations that applied cleanly. Empty when rolled back.
    pub applied: Vec<String>,
    /// Violations of the candidate result when it was rolled back.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    pub rolled_back: bool,
}

/// Applies a single operation, returning a new document.
pub fn apply_one(document: &Value, op: &Suggestion) -> Result<Value, OperationError> {
    let mut next = document.clone();
    apply_in_place(&mut next, op)?;
    Ok(next)
}

/// Atomic application: either every operation applies, in order, or the
/// first failure is returned and nothing is produced.
pub fn apply_sequence(document: &Value, ops: &[Suggestion]) -> Result<Value, OperationFailure> {
    ops.iter().try_fold(document.clone(), |next, op| {
        apply_one(&next, op).map_err(|error| OperationFailure::new(&op.id, error))
    })
}

/// Applies what it can, skipping failing operations. The final document must
/// pass schema validation, otherwise the original is returned with the
/// collected errors.
pub fn apply_best_effort(document: &Value, ops: &[Suggestion]) -> BestEffortOutcome {
    let mut next = document.clone();
    let mut errors = Vec::new();
    let mut applied = Vec::new();
    for op in ops {
        match apply_in_place(&mut next, op) {
            Ok(()) => applied.push(op.id.clone()),
            Err(error) => errors.push(OperationFailure::new(&op.id, error)),
        }
    }

    match validate(&next) {
        Ok(()) => BestEffortOutcome {
            document: next,
            errors,
            applied,
            violations: Vec::new(),
            rolled_back: false,
        },
        Err(violations) => {
            if errors.is_empty() {
                errors.push(OperationFailure::new(
                    BATCH_ERROR_ID,
                    OperationError::SchemaInvalid,
                ));
            }
            BestEffortOutcome {
                document: document.clone(),
                errors,
                applied: Vec::new(),
                violations,
                rolled_back: true,
            }
        }
    }
}

/// Mutates `document` only once every check for `op` has passed, so a failed
/// operation leaves it untouched.
fn apply_in_place(document: &mut Value, op: &Suggestion) -> Result<(), OperationError> {
    let mut tokens = parse_pointer(&op.path);
    let last = tokens.pop().ok_or(OperationError::RootOperation)?;
    let parent = resolve_mut(document, &tokens)?;

    match parent {
        Value::Array(items) => {
            let index = match parse_index(&last) {
                ArrayIndex::Index(index) => Some(index),
                ArrayIndex::Negative => None,
                ArrayIndex::Invalid => return Err(OperationError::ArrayIndexInvalid),
            };
            match op.kind {
                EditKind::Replace => {
                    let index = index
                        .filter(|i| *i < items.len())
                        .ok_or(OperationError::IndexOutOfBounds)?;
                    let value = new_value(op)?;
                    items[index] = value;
                }
                EditKind::Insert => {
                    let value = new_value(op)?;
                    let index = index
                        .filter(|i| *i <= items.len())
                        .ok_or(OperationError::IndexOutOfBounds)?;
                    items.insert(index, value);
                }
                EditKind::Delete => {
                    let index = index
                        .filter(|i| *i < items.len())
                        .ok_or(OperationError::IndexOutOfBounds)?;
                    items.remove(index);
                }
            }
        }
        Value::Object(map) => match op.kind {
            EditKind::Replace => {
                if !map.contains_key(&last) {
                    return Err(OperationError::KeyNotFound);
                }
                let value = new_value(op)?;
                map.insert(last, value);
            }
            EditKind::Insert => {
                let value = new_value(op)?;
                map.insert(last, value);
            }
            EditKind::Delete => {
                map.remove(&last).ok_or(OperationError::KeyNotFound)?;
            }
        },
        _ => return Err(OperationError::ParentNotContainer),
    }
    Ok(())
}

fn new_value(op: &Suggestion) -> Result<Value, OperationError> {
    op.new_value.clone().ok_or(OperationError::MissingNewValue)
}

/// Walks every segment; each must name an existing element or key.
fn resolve_mut<'a>(root: &'a mut Value, tokens: &[String]) -> Result<&'a mut Value, OperationError> {
    tokens.iter().try_fold(root, |target, token| match target {
        Value::Object(map) => map.get_mut(token.as_str()).ok_or(OperationError::PathNotFound),
        Value::Array(items) => match parse_index(token) {
            ArrayIndex::Index(index) => items.get_mut(index).ok_or(OperationError::PathNotFound),
            _ => Err(OperationError::PathNotFound),
        },
        _ => Err(OperationError::PathNotFound),
    })
}
