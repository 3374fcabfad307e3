// Patch Engine: JSON-pointer addressed replace/insert/delete over a dynamic
// document value, atomic and best-effort.

pub mod engine;
pub mod pointer;

pub use engine::{
    apply_best_effort, apply_sequence, OperationError, OperationFailure, BATCH_ERROR_ID,
};
