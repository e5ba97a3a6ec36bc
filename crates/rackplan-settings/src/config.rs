//! Configuration for the layout engine
//!
//! Configuration is organized into logical sections:
//! - Layout tolerances (adjacency, alignment, repair search limits)
//! - Tie-beam rules (span, slenderness threshold, frame alignment)
//! - History depth
//!
//! Missing keys fall back to their defaults so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

const CONFIG_DIR_NAME: &str = "rackplan";
const CONFIG_FILE_NAME: &str = "engine.toml";

/// Tolerances used by validity checking and rack grouping (all in mm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Largest gap between two racks that still puts them in one row
    pub adjacency_tolerance: f64,
    /// Largest difference in cross offset/depth for racks to count as collinear
    pub alignment_tolerance: f64,
    /// Overlaps smaller than this are treated as touching
    pub overlap_epsilon: f64,
    /// Iteration cap of the repair search
    pub repair_max_iterations: usize,
    /// How often grouping may re-run after master/subordinate conversion moved racks
    pub max_derive_passes: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            adjacency_tolerance: 100.0,
            alignment_tolerance: 1.0,
            overlap_epsilon: 0.01,
            repair_max_iterations: 16,
            max_derive_passes: 4,
        }
    }
}

/// Tie-beam placement rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieBeamSettings {
    /// Widest aisle (mm) a tie beam may span
    pub max_span: f64,
    /// Racks with height / depth above this need tie beams
    pub height_depth_ratio: f64,
    /// Largest offset (mm) between two frames that a beam can still connect
    pub frame_align_tolerance: f64,
    /// Drawn width of a beam (mm)
    pub beam_width: f64,
}

impl Default for TieBeamSettings {
    fn default() -> Self {
        Self {
            max_span: 4000.0,
            height_depth_ratio: 6.0,
            frame_align_tolerance: 50.0,
            beam_width: 100.0,
        }
    }
}

/// Undo history limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Number of undo steps retained. The current state is kept on top.
    pub max_depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Layout tolerances
    pub layout: LayoutSettings,
    /// Tie-beam rules
    pub tie_beam: TieBeamSettings,
    /// History limits
    pub history: HistorySettings,
}

impl EngineConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(SettingsError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        config.validate()?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Load the config from [`default_config_path`], or defaults when the
    /// file does not exist yet.
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            other => {
                return Err(SettingsError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        positive("layout.adjacency_tolerance", self.layout.adjacency_tolerance)?;
        positive("layout.alignment_tolerance", self.layout.alignment_tolerance)?;
        if self.layout.overlap_epsilon.is_nan() || self.layout.overlap_epsilon < 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "layout.overlap_epsilon".to_string(),
                value: self.layout.overlap_epsilon.to_string(),
            });
        }
        if self.layout.repair_max_iterations == 0 {
            return Err(not_positive("layout.repair_max_iterations", 0));
        }
        if self.layout.max_derive_passes == 0 {
            return Err(not_positive("layout.max_derive_passes", 0));
        }

        positive("tie_beam.max_span", self.tie_beam.max_span)?;
        positive("tie_beam.height_depth_ratio", self.tie_beam.height_depth_ratio)?;
        positive("tie_beam.beam_width", self.tie_beam.beam_width)?;
        if self.tie_beam.frame_align_tolerance.is_nan() || self.tie_beam.frame_align_tolerance < 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "tie_beam.frame_align_tolerance".to_string(),
                value: self.tie_beam.frame_align_tolerance.to_string(),
            });
        }

        if self.history.max_depth < 2 {
            return Err(ConfigError::ValueOutOfRange {
                key: "history.max_depth".to_string(),
                value: self.history.max_depth.to_string(),
            });
        }

        Ok(())
    }
}

/// Platform specific location of the engine config file
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn positive(key: &str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(not_positive(key, value))
    }
}

fn not_positive(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::NotPositive {
        key: key.to_string(),
        value: value.to_string(),
    }
}
