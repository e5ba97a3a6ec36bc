//! # Event Bus Module
//!
//! Publish/subscribe channel between the layout engine and the presentation
//! layer. Each document owns its own bus; there is no global instance.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rackplan_core::event_bus::{AppEvent, EventBus, EventCategory, EventFilter, LayoutEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Layout]),
//!     |event| {
//!         if let AppEvent::Layout(LayoutEvent::ShapesChanged { sheet }) = event {
//!             println!("sheet {sheet} needs a repaint");
//!         }
//!     },
//! );
//!
//! bus.publish(AppEvent::Layout(LayoutEvent::ShapesChanged { sheet: 0 })).ok();
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
