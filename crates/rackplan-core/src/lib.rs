//! # RackPlan Core
//!
//! Core types shared by the RackPlan crates: the layout error taxonomy and
//! the event bus the engine uses to notify the presentation layer.

pub mod error;
pub mod event_bus;

pub use error::{LayoutError, Result};

pub use event_bus::{
    AppEvent, DiagnosticEvent, EventBus, EventBusConfig, EventBusError, EventCategory,
    EventFilter, HistoryEvent, LayoutEvent, SubscriptionId,
};

/// Identifier of a shape inside a sheet's registry.
pub type ShapeId = u64;
