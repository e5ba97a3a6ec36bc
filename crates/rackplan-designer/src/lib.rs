//! # RackPlan Designer
//!
//! Layout engine for warehouse rack drawings. It keeps every sheet of a
//! document geometrically consistent while the user edits it, and keeps a
//! whole-document undo/redo history.
//!
//! ## Core Components
//!
//! ### Geometry
//! - **Shapes**: racks, building columns, blocks, aisle spaces, walls,
//!   shutters and sheet markers
//! - **Registry**: per sheet shape storage with z-order rules
//! - **Validity**: overlap and margin rules per shape kind, with a bounded
//!   repair search
//!
//! ### Derived Data
//! - **Grouping**: rack rows and columns, master/subordinate frames
//! - **Size Index**: shared numbering of identical rack and column builds
//! - **Tie Beams**: beams across narrow aisles for slender racks
//!
//! ### Document
//! - **History**: snapshot undo/redo with interactive commands
//! - **Check**: whole-document repair after loading
//! - **Persistence**: tolerant file model
//!
//! ## Architecture
//!
//! ```text
//! DrawingDocument
//!   ├── DocumentState (undo unit)
//!   │     ├── Sheets → ShapeRegistry, groups, tie beams
//!   │     └── Size tables, rack settings, metadata
//!   ├── UndoRedoManager<DocumentState>
//!   └── EventBus (notifications)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rackplan_designer::{DrawingDocument, Rotation, Shape};
//!
//! let mut doc = DrawingDocument::default();
//! let sheet = doc.add_sheet("Hall A", 40000.0, 20000.0)?;
//! doc.create_shape(sheet, Shape::rack(0.0, 0.0, 2800.0, 1100.0, 8000.0, Rotation::Horizontal))?;
//! doc.undo()?;
//! ```

pub mod catalog;
pub mod confirm;
pub mod document;
pub mod geometry;
pub mod grouping;
pub mod history;
pub mod model;
pub mod persistence;
pub mod rack_settings;
pub mod registry;
pub mod sheet;
pub mod size_index;
pub mod tie_beam;
pub mod validity;

pub use catalog::{ColumnCatalog, TableCatalog, UprightPart, UprightRequirement};
pub use confirm::{Confirmation, ConfirmationService, FixedAnswer};
pub use document::{CheckOutcome, DocumentMetadata, DocumentState, DrawingDocument};
pub use geometry::{Axis, Bounds, Offset, Point, Rotation};
pub use grouping::RackGroup;
pub use history::{HistoryMode, UndoRedoManager};
pub use model::{
    BeamLevel, Column, ColumnSignature, FrameEnd, LayoutRules, Rack, RackAccessories, RackConfig,
    RackSignature, Shape, ShapeKind, ShapeType, TieBeam,
};
pub use persistence::{LoadReport, PersistedDocument, PersistedShape, PersistedSheet, FORMAT_VERSION};
pub use rack_settings::RackSettings;
pub use registry::ShapeRegistry;
pub use sheet::Sheet;
pub use size_index::{SizeEntry, SizeIndexTable};
pub use tie_beam::TieBeamResult;
pub use validity::{Conflict, ConflictTarget, Repair, Validity};

pub use rackplan_core::{LayoutError, Result, ShapeId};
