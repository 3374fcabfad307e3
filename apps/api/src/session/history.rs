//! Version Log — linear undo/redo over whole-document snapshots.
//!
//! Append-only in the sense that recorded snapshots are never edited; a new
//! record discards the redo branch. Ids grow monotonically and are never
//! reused, even after undo.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::resume::Resume;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionEntry {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub document: Resume,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionSummary {
    pub id: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&VersionEntry> for VersionSummary {
    fn from(entry: &VersionEntry) -> Self {
        Self {
            id: entry.id,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

#[derive(Debug, Clone)]
pub struct VersionLog {
    past: Vec<VersionEntry>,
    current: VersionEntry,
    future: Vec<VersionEntry>,
    next_id: u64,
}

impl VersionLog {
    pub fn new(document: Resume) -> Self {
        Self {
            past: Vec::new(),
            current: VersionEntry {
                id: 1,
                created_at: Utc::now(),
                document,
            },
            future: Vec::new(),
            next_id: 2,
        }
    }

    pub fn current(&self) -> &VersionEntry {
        &self.current
    }

    /// Records a new snapshot as current and clears the redo stack.
    pub fn record(&mut self, document: Resume) -> &VersionEntry {
        let entry = VersionEntry {
            id: self.next_id,
            created_at: Utc::now(),
            document,
        };
        self.next_id += 1;
        let previous = std::mem::replace(&mut self.current, entry);
        self.past.push(previous);
        self.future.clear();
        &self.current
    }

    pub fn undo(&mut self) -> Result<&VersionEntry, HistoryError> {
        let previous = self.past.pop().ok_or(HistoryError::NothingToUndo)?;
        let undone = std::mem::replace(&mut self.current, previous);
        self.future.push(undone);
        Ok(&self.current)
    }

    pub fn redo(&mut self) -> Result<&VersionEntry, HistoryError> {
        let next = self.future.pop().ok_or(HistoryError::NothingToRedo)?;
        let replaced = std::mem::replace(&mut self.current, next);
        self.past.push(replaced);
        Ok(&self.current)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Oldest first: undoable snapshots, then the current one.
    pub fn past_and_current(&self) -> Vec<VersionSummary> {
        self.past
            .iter()
            .chain(std::iter::once(&self.current))
            .map(VersionSummary::from)
            .collect()
    }

    /// Next redo first.
    pub fn redoable(&self) -> Vec<VersionSummary> {
        self.future.iter().rev().map(VersionSummary::from).collect()
    }
}
