// Heuristic structuring of raw resume text.
// Pattern-only; anything it cannot resolve is flagged for the external
// structuring collaborator rather than guessed.

pub mod handlers;
pub mod heuristics;
pub mod patterns;
pub mod text;

pub use heuristics::{structure_heuristically, DroppedItems};
pub use text::{assemble_raw_text, PageText};
