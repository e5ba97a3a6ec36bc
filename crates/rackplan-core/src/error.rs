//! Error handling for RackPlan
//!
//! Every document command either commits or leaves the document exactly as it
//! was; the variants below describe why a command was refused. None of them
//! are fatal: the worst outcome is the loss of newly added geometry.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::ShapeId;

/// Layout engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A shape overlaps other shapes (or leaves the sheet) and could not be
    /// repositioned.
    #[error("Shape {shape} cannot be placed: conflicts with {conflicts:?}")]
    LayoutConflict {
        /// The shape being placed.
        shape: ShapeId,
        /// Shapes it overlaps. Empty when the sheet border is the only conflict.
        conflicts: Vec<ShapeId>,
    },

    /// The bounded repair search gave up on a shape.
    #[error("No valid position found for shape {shape} after {iterations} attempts")]
    Unrepairable {
        /// The shape that could not be repositioned.
        shape: ShapeId,
        /// The number of repair iterations tried.
        iterations: usize,
    },

    /// A rack is taller than the clear height available on the sheet.
    #[error("Rack {shape} height {height} exceeds clear height {clear_height}")]
    HeightExceeded {
        /// The offending rack.
        shape: ShapeId,
        /// The rack height, including any tie beam.
        height: f64,
        /// The available clear height.
        clear_height: f64,
    },

    /// A size index could not be resolved. Self-healed by the indexer, only
    /// surfaced by diagnostics.
    #[error("Shape {shape} references unknown size index {index}")]
    IndexInconsistency {
        /// The shape holding the stale index.
        shape: ShapeId,
        /// The stale index.
        index: usize,
    },

    /// Sheet index out of range
    #[error("Unknown sheet {0}")]
    UnknownSheet(usize),

    /// Shape id not present on the sheet
    #[error("Unknown shape {0}")]
    UnknownShape(ShapeId),

    /// Geometry or parameters are not acceptable
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// Why the shape was rejected.
        reason: String,
    },

    /// A command needs a selection and none exists
    #[error("Nothing selected")]
    NoSelection,

    /// Another interactive command is still open
    #[error("Command already in progress")]
    CommandInProgress,

    /// No interactive command is open
    #[error("No command in progress")]
    NoCommand,
}

impl LayoutError {
    /// Shorthand for [`LayoutError::InvalidShape`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Whether the error is a geometric conflict (as opposed to bad input).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::LayoutConflict { .. } | Self::Unrepairable { .. }
        )
    }
}

/// Result type alias for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
