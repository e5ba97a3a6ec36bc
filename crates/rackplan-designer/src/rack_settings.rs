//! Rack-wide settings shared by every rack of a document.
//!
//! These are part of the document (and therefore of every undo snapshot),
//! unlike the engine tolerances in `rackplan_settings`.

use serde::{Deserialize, Serialize};

/// Document level rack construction settings (mm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackSettings {
    /// Length of the leading frame a master rack carries and subordinate racks share
    pub frame_offset: f64,
    /// Clear height of the building under the lowest obstruction
    pub clear_height: f64,
    /// How far pallets stick out of the rack front
    pub pallet_overhang: f64,
    /// Pallets are flush with the rack front (no overhang)
    pub pallets_flush: bool,
    /// Height a tie beam adds on top of the uprights
    pub tie_beam_height: f64,
}

impl Default for RackSettings {
    fn default() -> Self {
        Self {
            frame_offset: 80.0,
            clear_height: 12000.0,
            pallet_overhang: 50.0,
            pallets_flush: false,
            tie_beam_height: 150.0,
        }
    }
}

impl RackSettings {
    /// Distance a rack front may sit back from an aisle edge and still face it.
    pub fn back_clearance(&self) -> f64 {
        if self.pallets_flush {
            0.0
        } else {
            self.pallet_overhang.max(0.0)
        }
    }

    pub fn validate(&self) -> rackplan_core::Result<()> {
        use rackplan_core::LayoutError;
        if !(self.frame_offset.is_finite() && self.frame_offset >= 0.0) {
            return Err(LayoutError::invalid("frame offset must be >= 0"));
        }
        if !(self.clear_height.is_finite() && self.clear_height > 0.0) {
            return Err(LayoutError::invalid("clear height must be > 0"));
        }
        if !(self.pallet_overhang.is_finite() && self.pallet_overhang >= 0.0) {
            return Err(LayoutError::invalid("pallet overhang must be >= 0"));
        }
        if !(self.tie_beam_height.is_finite() && self.tie_beam_height >= 0.0) {
            return Err(LayoutError::invalid("tie beam height must be >= 0"));
        }
        Ok(())
    }
}
