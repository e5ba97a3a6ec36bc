use serde::{Deserialize, Serialize};

use rackplan_core::LayoutError;

/// Rounds a length in mm to an integer count of 0.1 mm.
pub fn normalize_mm(value: f64) -> i64 {
    (value * 10.0).round() as i64
}

/// One pair of beams at a given elevation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamLevel {
    /// Top of beam above floor (mm)
    pub elevation: f64,
    /// Catalog code of the beam profile
    pub beam_profile: String,
    /// Load per level (kg)
    pub load_kg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RackAccessories {
    pub wire_decks: bool,
    pub column_guards: bool,
    pub back_stops: bool,
}

/// Structural configuration of a rack.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RackConfig {
    pub levels: Vec<BeamLevel>,
    pub accessories: RackAccessories,
    /// Upright part chosen from the column catalog, `None` until selected.
    pub upright: Option<String>,
}

impl RackConfig {
    pub fn total_load_kg(&self) -> f64 {
        self.levels.iter().map(|l| l.load_kg).sum()
    }

    pub fn max_level_load_kg(&self) -> f64 {
        self.levels.iter().map(|l| l.load_kg).fold(0.0, f64::max)
    }

    pub(crate) fn validate(&self, height: f64) -> rackplan_core::Result<()> {
        for level in &self.levels {
            if !(level.elevation.is_finite() && level.elevation >= 0.0 && level.elevation < height)
            {
                return Err(LayoutError::invalid(format!(
                    "beam level at {} lies outside rack height {}",
                    level.elevation, height
                )));
            }
            if !(level.load_kg.is_finite() && level.load_kg >= 0.0) {
                return Err(LayoutError::invalid("level load must be >= 0"));
            }
        }
        Ok(())
    }
}

/// Rack payload of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rack {
    pub config: RackConfig,
    /// Master (M) rack: first of its row/column, its length includes the frame offset.
    pub is_first_in_row_column: bool,
    pub size_index: Option<usize>,
    /// Token of the last command that structurally edited this rack.
    pub change_order: u64,
    /// Index into the sheet's group list. Derived, never saved.
    #[serde(skip)]
    pub group: Option<usize>,
    /// A tie beam is required but would exceed the clear height. Derived,
    /// never saved.
    #[serde(skip)]
    pub tie_beam_error: bool,
}

impl Default for Rack {
    fn default() -> Self {
        Self {
            config: RackConfig::default(),
            is_first_in_row_column: true,
            size_index: None,
            change_order: 0,
            group: None,
            tie_beam_error: false,
        }
    }
}

impl Rack {
    pub fn with_config(config: RackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_master(&self) -> bool {
        self.is_first_in_row_column
    }
}

/// Normalized structural fields of a rack. Position, rotation and display
/// properties are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RackSignature {
    pub bay_length: i64,
    pub depth: i64,
    pub height: i64,
    pub master: bool,
    /// (elevation, beam profile, load) per level, in 0.1 mm / 0.1 kg.
    pub levels: Vec<(i64, String, i64)>,
    pub accessories: RackAccessories,
    pub upright: Option<String>,
}

impl RackSignature {
    pub(crate) fn new(rack: &Rack, bay_length: f64, depth: f64, height: f64) -> Self {
        let mut levels: Vec<(i64, String, i64)> = rack
            .config
            .levels
            .iter()
            .map(|l| {
                (
                    normalize_mm(l.elevation),
                    l.beam_profile.clone(),
                    normalize_mm(l.load_kg),
                )
            })
            .collect();
        levels.sort();
        Self {
            bay_length: normalize_mm(bay_length),
            depth: normalize_mm(depth),
            height: normalize_mm(height),
            master: rack.is_first_in_row_column,
            levels,
            accessories: rack.config.accessories,
            upright: rack.config.upright.clone(),
        }
    }
}
