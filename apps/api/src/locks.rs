//! Lock Evaluator — decides whether a document path may be edited.
//!
//! A lock pattern is a pointer whose segments may be `*`, matching exactly one
//! segment at the same position. Explicitly unlocked exact paths always win.
//! This is a policy oracle only; the patch engine knows nothing about locks.

use serde::{Deserialize, Serialize};

use crate::models::suggestion::Suggestion;

pub const WILDCARD: &str = "*";

fn segments(pointer: &str) -> impl Iterator<Item = &str> {
    pointer.split('/').skip(1)
}

/// True when `path` has as many segments as `pattern` and every non-wildcard
/// segment matches literally.
pub fn path_matches_pattern(path: &str, pattern: &str) -> bool {
    let path_segments: Vec<&str> = segments(path).collect();
    let pattern_segments: Vec<&str> = segments(pattern).collect();
    path_segments.len() == pattern_segments.len()
        && path_segments
            .iter()
            .zip(&pattern_segments)
            .all(|(seg, pat)| *pat == WILDCARD || seg == pat)
}

pub fn is_locked(path: &str, locked_patterns: &[String], unlocked_exact: &[String]) -> bool {
    if unlocked_exact.iter().any(|p| p == path) {
        return false;
    }
    locked_patterns
        .iter()
        .any(|pattern| path_matches_pattern(path, pattern))
}

/// Locked patterns plus explicit per-path overrides, as held by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPolicy {
    #[serde(default)]
    pub locked: Vec<String>,
    #[serde(default)]
    pub unlocked: Vec<String>,
}

impl LockPolicy {
    pub fn new(locked: Vec<String>, unlocked: Vec<String>) -> Self {
        Self { locked, unlocked }
    }

    pub fn is_locked(&self, path: &str) -> bool {
        is_locked(path, &self.locked, &self.unlocked)
    }

    /// Splits a batch into operations that may proceed and those that target
    /// locked paths, preserving order within each half.
    pub fn partition(&self, ops: Vec<Suggestion>) -> (Vec<Suggestion>, Vec<Suggestion>) {
        ops.into_iter().partition(|op| !self.is_locked(&op.path))
    }
}
