//! A bounded drawing sheet with its shapes and derived rack data.

use serde::{Deserialize, Serialize};

use rackplan_core::ShapeId;

use crate::geometry::Bounds;
use crate::grouping::RackGroup;
use crate::model::Shape;
use crate::registry::ShapeRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    /// Extent along X (mm)
    pub length: f64,
    /// Extent along Y (mm)
    pub width: f64,
    pub shapes: ShapeRegistry,
    /// Derived: rack rows/columns, rebuilt on every change.
    pub groups: Vec<RackGroup>,
    /// Derived: tie beams, rebuilt on every change.
    pub tie_beams: Vec<Shape>,
    /// Derived: racks needing a tie beam they cannot take.
    pub tie_beam_errors: Vec<ShapeId>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, length: f64, width: f64) -> Self {
        Self {
            name: name.into(),
            length,
            width,
            shapes: ShapeRegistry::new(),
            groups: Vec::new(),
            tie_beams: Vec::new(),
            tie_beam_errors: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.length, self.width)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    /// The group a rack belongs to.
    pub fn group_of(&self, rack: ShapeId) -> Option<&RackGroup> {
        let index = self.shape(rack)?.as_rack()?.group?;
        self.groups.get(index)
    }
}
