//! Upright selection for racks.
//!
//! The engine only needs a part code per rack; where the parts come from is
//! up to the host, which plugs in a [`ColumnCatalog`].

use serde::{Deserialize, Serialize};

/// What a rack needs from its uprights.
#[derive(Debug, Clone, PartialEq)]
pub struct UprightRequirement {
    pub height: f64,
    pub depth: f64,
    pub max_level_load_kg: f64,
    pub level_count: usize,
}

impl UprightRequirement {
    pub fn total_load_kg(&self) -> f64 {
        self.max_level_load_kg * self.level_count as f64
    }
}

/// One upright frame part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UprightPart {
    pub code: String,
    /// Tallest frame available for this part (mm)
    pub max_height: f64,
    /// Total bay load the frame carries (kg)
    pub capacity_kg: f64,
}

pub trait ColumnCatalog {
    /// Picks an upright for the requirement, `None` if nothing fits.
    fn select_upright(&self, requirement: &UprightRequirement) -> Option<UprightPart>;
}

/// Catalog backed by a list of parts, searched in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCatalog {
    pub parts: Vec<UprightPart>,
}

impl TableCatalog {
    pub fn new(parts: Vec<UprightPart>) -> Self {
        Self { parts }
    }

    /// A small light-to-heavy range of frames.
    pub fn standard() -> Self {
        let part = |code: &str, max_height: f64, capacity_kg: f64| UprightPart {
            code: code.to_string(),
            max_height,
            capacity_kg,
        };
        Self::new(vec![
            part("UP-70", 6000.0, 8000.0),
            part("UP-90", 9000.0, 14000.0),
            part("UP-110", 12000.0, 20000.0),
            part("UP-130", 15000.0, 30000.0),
        ])
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ColumnCatalog for TableCatalog {
    fn select_upright(&self, requirement: &UprightRequirement) -> Option<UprightPart> {
        self.parts
            .iter()
            .find(|p| p.max_height >= requirement.height && p.capacity_kg >= requirement.total_load_kg())
            .cloned()
    }
}
