//! RackPlan Settings Crate
//!
//! Tolerances and limits used by the layout engine, loadable from JSON or
//! TOML files in the platform configuration directory.

pub mod config;
pub mod error;

pub use config::{default_config_path, EngineConfig, HistorySettings, LayoutSettings, TieBeamSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
