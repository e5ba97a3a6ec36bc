//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so the presentation layer can log or
//! replay them.

use serde::{Deserialize, Serialize};

use crate::ShapeId;

/// Root event enum for all engine notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Geometry on a sheet changed
    Layout(LayoutEvent),
    /// Undo/redo stack moved
    History(HistoryEvent),
    /// Problems the user should see
    Diagnostics(DiagnosticEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Layout(_) => EventCategory::Layout,
            AppEvent::History(_) => EventCategory::History,
            AppEvent::Diagnostics(_) => EventCategory::Diagnostics,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Layout(e) => e.description(),
            AppEvent::History(e) => e.description(),
            AppEvent::Diagnostics(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Geometry events.
    Layout,
    /// Undo/redo events.
    History,
    /// Errors and warnings surfaced to the user.
    Diagnostics,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Layout => write!(f, "Layout"),
            EventCategory::History => write!(f, "History"),
            EventCategory::Diagnostics => write!(f, "Diagnostics"),
        }
    }
}

/// Geometry events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutEvent {
    /// Shapes or derived data (groups, indices, tie beams) on a sheet changed.
    ShapesChanged {
        /// Sheet index.
        sheet: usize,
    },
    /// Shapes were deleted to keep the layout valid.
    ShapesRemoved {
        /// Sheet index.
        sheet: usize,
        /// Number of deleted shapes.
        count: usize,
    },
    /// A sheet was appended to the document.
    SheetAdded {
        /// Index of the new sheet.
        sheet: usize,
    },
    /// The active sheet changed.
    CurrentSheetChanged {
        /// Index of the active sheet.
        sheet: usize,
    },
}

impl LayoutEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            LayoutEvent::ShapesChanged { sheet } => format!("Sheet {} changed", sheet),
            LayoutEvent::ShapesRemoved { sheet, count } => {
                format!("{} shape(s) removed from sheet {}", count, sheet)
            }
            LayoutEvent::SheetAdded { sheet } => format!("Sheet {} added", sheet),
            LayoutEvent::CurrentSheetChanged { sheet } => format!("Sheet {} activated", sheet),
        }
    }
}

/// Undo/redo events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// A new snapshot was recorded.
    Recorded {
        /// Whether undo is available.
        can_undo: bool,
        /// Whether redo is available.
        can_redo: bool,
    },
    /// The document moved back one snapshot.
    Undone {
        /// Whether undo is still available.
        can_undo: bool,
        /// Whether redo is available.
        can_redo: bool,
    },
    /// The document moved forward one snapshot.
    Redone {
        /// Whether undo is available.
        can_undo: bool,
        /// Whether redo is still available.
        can_redo: bool,
    },
    /// A rejected command was rolled back to the last snapshot.
    Reverted,
    /// History was cleared (e.g. after a save).
    Purged,
}

impl HistoryEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            HistoryEvent::Recorded { .. } => "Snapshot recorded".to_string(),
            HistoryEvent::Undone { .. } => "Undo".to_string(),
            HistoryEvent::Redone { .. } => "Redo".to_string(),
            HistoryEvent::Reverted => "Reverted to last snapshot".to_string(),
            HistoryEvent::Purged => "History purged".to_string(),
        }
    }
}

/// Diagnostics shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    /// A command was refused and the document is unchanged.
    OperationRejected {
        /// Human readable reason.
        reason: String,
    },
    /// Racks that cannot take a tie beam without exceeding clear height.
    TieBeamErrors {
        /// Sheet index.
        sheet: usize,
        /// Affected racks.
        racks: Vec<ShapeId>,
    },
}

impl DiagnosticEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            DiagnosticEvent::OperationRejected { reason } => {
                format!("Operation rejected: {}", reason)
            }
            DiagnosticEvent::TieBeamErrors { sheet, racks } => format!(
                "{} rack(s) on sheet {} cannot take a tie beam",
                racks.len(),
                sheet
            ),
        }
    }
}
