//! Undo/redo history of whole-document snapshots.

use serde::{Deserialize, Serialize};

/// What the document is doing with respect to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryMode {
    /// Every committed change records a snapshot.
    #[default]
    Idle,
    /// An interactive command is open; intermediate changes are not recorded.
    InCommand,
    /// A snapshot is being restored; nothing is recorded.
    Restoring,
}

/// Linear snapshot history.
///
/// The entry at the current position is the state the document shows.
/// Recording after an undo drops the redo tail, and the oldest entries fall
/// off once more than `max_depth` undo steps are stored.
#[derive(Debug, Clone)]
pub struct UndoRedoManager<T> {
    states: Vec<T>,
    position: usize,
    max_depth: usize,
}

impl<T> UndoRedoManager<T> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            states: Vec::new(),
            position: 0,
            max_depth: max_depth.max(1),
        }
    }

    pub fn record(&mut self, state: T) {
        if !self.states.is_empty() {
            self.states.truncate(self.position + 1);
        }
        self.states.push(state);
        self.position = self.states.len() - 1;

        let overflow = self.states.len().saturating_sub(self.max_depth + 1);
        if overflow > 0 {
            self.states.drain(..overflow);
            self.position -= overflow;
        }
    }

    /// Steps back and returns the state to restore.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.position -= 1;
        self.states.get(self.position)
    }

    /// Steps forward and returns the state to restore.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.position += 1;
        self.states.get(self.position)
    }

    pub fn current(&self) -> Option<&T> {
        self.states.get(self.position)
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.states.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.position
    }

    pub fn redo_depth(&self) -> usize {
        self.states.len().saturating_sub(self.position + 1)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Forgets everything but `state`, which becomes the only entry.
    pub fn purge(&mut self, state: T) {
        self.states.clear();
        self.states.push(state);
        self.position = 0;
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.position = 0;
    }
}
