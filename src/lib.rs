//! # RackPlan
//!
//! A layout engine for warehouse racking drawings:
//! - Overlap validity checking with margins and automatic repair
//! - Rack rows and columns with master/subordinate frame handling
//! - Size indices for the bill of materials
//! - Tie-beam placement across narrow aisles
//! - Snapshot based undo/redo
//!
//! ## Architecture
//!
//! RackPlan is organized as a workspace with multiple crates:
//!
//! 1. **rackplan-core** - Error types and the event bus
//! 2. **rackplan-settings** - Engine tolerances and limits
//! 3. **rackplan-designer** - Shapes, sheets, derivation and the drawing document
//! 4. **rackplan** - Headless binary that loads and checks layout files

pub mod cli;

pub use rackplan_core::{
    AppEvent, DiagnosticEvent, EventBus, EventCategory, EventFilter, HistoryEvent, LayoutError,
    LayoutEvent, Result, ShapeId,
};
pub use rackplan_designer as designer;
pub use rackplan_designer::{
    CheckOutcome, Confirmation, DrawingDocument, FixedAnswer, LoadReport, PersistedDocument,
    RackSettings, Shape, Sheet,
};
pub use rackplan_settings::{EngineConfig, HistorySettings, LayoutSettings, TieBeamSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, so reports on stdout stay clean
/// - RUST_LOG environment variable support
/// - JSON lines instead of text when `json` is set
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
