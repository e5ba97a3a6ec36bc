//! Shapes placed on a sheet.
//!
//! Every shape shares the same placement record ([`Shape`]); the kind specific
//! payload lives in the closed [`ShapeKind`] enum. The validity checker never
//! dispatches on concrete pairs of payload types, it asks the small
//! [`LayoutRules`] capability set instead.

use serde::{Deserialize, Serialize};

use rackplan_core::{LayoutError, ShapeId};

use crate::geometry::{Axis, Bounds, Offset, Point, Rotation};

mod column;
mod rack;

pub use column::{Column, ColumnSignature};
pub use rack::{normalize_mm, BeamLevel, Rack, RackAccessories, RackConfig, RackSignature};

/// Kind tag of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Rack,
    Column,
    Block,
    AisleSpace,
    Wall,
    Shutter,
    TieBeam,
    SheetMarker,
}

impl ShapeType {
    pub fn name(self) -> &'static str {
        match self {
            ShapeType::Rack => "Rack",
            ShapeType::Column => "Column",
            ShapeType::Block => "Block",
            ShapeType::AisleSpace => "AisleSpace",
            ShapeType::Wall => "Wall",
            ShapeType::Shutter => "Shutter",
            ShapeType::TieBeam => "TieBeam",
            ShapeType::SheetMarker => "SheetMarker",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Rack" => ShapeType::Rack,
            "Column" => ShapeType::Column,
            "Block" => ShapeType::Block,
            "AisleSpace" => ShapeType::AisleSpace,
            "Wall" => ShapeType::Wall,
            "Shutter" => ShapeType::Shutter,
            "TieBeam" => ShapeType::TieBeam,
            "SheetMarker" => ShapeType::SheetMarker,
            _ => return None,
        })
    }
}

/// Which frame of a rack a tie beam is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameEnd {
    Start,
    End,
}

/// A derived beam connecting two opposing rack frames across an aisle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieBeam {
    /// Aisle the beam spans.
    pub aisle: ShapeId,
    /// Rack on the near (lower coordinate) side and rack on the far side.
    pub racks: (ShapeId, ShapeId),
    /// Frame of the near rack the beam is attached to.
    pub frame: FrameEnd,
    /// Run axis coordinate of the beam centre line.
    pub frame_position: f64,
}

/// Kind specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rack(Rack),
    Column(Column),
    Block,
    AisleSpace,
    Wall,
    Shutter,
    TieBeam(TieBeam),
    SheetMarker { label: String },
}

/// Capabilities consulted by the validity checker and the registry.
pub trait LayoutRules {
    fn shape_type(&self) -> ShapeType;

    /// Never takes part in overlap checks.
    fn is_overlap_exempt(&self) -> bool {
        matches!(
            self.shape_type(),
            ShapeType::SheetMarker | ShapeType::TieBeam
        )
    }

    /// Boundary fixture: never a conflict source and may sit on the sheet border.
    fn is_boundary_fixture(&self) -> bool {
        self.shape_type() == ShapeType::Wall
    }

    /// Kept after all other kinds in z-order.
    fn draws_on_top(&self) -> bool {
        matches!(self.shape_type(), ShapeType::Column | ShapeType::Shutter)
    }

    /// Shapes of the same family may not overlap each other.
    fn family(&self) -> ShapeType {
        self.shape_type()
    }
}

impl LayoutRules for ShapeKind {
    fn shape_type(&self) -> ShapeType {
        match self {
            ShapeKind::Rack(_) => ShapeType::Rack,
            ShapeKind::Column(_) => ShapeType::Column,
            ShapeKind::Block => ShapeType::Block,
            ShapeKind::AisleSpace => ShapeType::AisleSpace,
            ShapeKind::Wall => ShapeType::Wall,
            ShapeKind::Shutter => ShapeType::Shutter,
            ShapeKind::TieBeam(_) => ShapeType::TieBeam,
            ShapeKind::SheetMarker { .. } => ShapeType::SheetMarker,
        }
    }
}

/// A shape placed on a sheet.
///
/// `length` is measured along the shape's run axis and `width` across it, so
/// a vertical rack keeps its bay length in `length`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub name: String,
    pub kind: ShapeKind,
    pub top_left: Point,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: Rotation,
    pub margin_x: f64,
    pub margin_y: f64,
    /// False while the shape is still being drawn.
    pub initialized: bool,
}

impl LayoutRules for Shape {
    fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }
}

impl Shape {
    /// Creates a committed shape. The registry assigns the id.
    pub fn new(
        kind: ShapeKind,
        top_left: Point,
        length: f64,
        width: f64,
        height: f64,
        rotation: Rotation,
    ) -> Self {
        let name = kind.shape_type().name().to_string();
        Self {
            id: 0,
            name,
            kind,
            top_left,
            length,
            width,
            height,
            rotation,
            margin_x: 0.0,
            margin_y: 0.0,
            initialized: true,
        }
    }

    /// A master rack with no beam levels configured.
    pub fn rack(x: f64, y: f64, length: f64, depth: f64, height: f64, rotation: Rotation) -> Self {
        Self::new(
            ShapeKind::Rack(Rack::default()),
            Point::new(x, y),
            length,
            depth,
            height,
            rotation,
        )
    }

    pub fn column(x: f64, y: f64, size_x: f64, size_y: f64, height: f64, profile: &str) -> Self {
        Self::new(
            ShapeKind::Column(Column::new(profile)),
            Point::new(x, y),
            size_x,
            size_y,
            height,
            Rotation::Horizontal,
        )
    }

    pub fn block(x: f64, y: f64, size_x: f64, size_y: f64) -> Self {
        Self::new(
            ShapeKind::Block,
            Point::new(x, y),
            size_x,
            size_y,
            0.0,
            Rotation::Horizontal,
        )
    }

    pub fn aisle(x: f64, y: f64, size_x: f64, size_y: f64) -> Self {
        Self::new(
            ShapeKind::AisleSpace,
            Point::new(x, y),
            size_x,
            size_y,
            0.0,
            Rotation::Horizontal,
        )
    }

    pub fn wall(x: f64, y: f64, length: f64, thickness: f64, rotation: Rotation) -> Self {
        Self::new(
            ShapeKind::Wall,
            Point::new(x, y),
            length,
            thickness,
            0.0,
            rotation,
        )
    }

    pub fn shutter(x: f64, y: f64, length: f64, swing: f64, rotation: Rotation) -> Self {
        Self::new(
            ShapeKind::Shutter,
            Point::new(x, y),
            length,
            swing,
            0.0,
            rotation,
        )
    }

    pub fn marker(x: f64, y: f64, label: &str) -> Self {
        Self::new(
            ShapeKind::SheetMarker {
                label: label.to_string(),
            },
            Point::new(x, y),
            1.0,
            1.0,
            0.0,
            Rotation::Horizontal,
        )
    }

    pub fn with_margin(mut self, margin_x: f64, margin_y: f64) -> Self {
        self.margin_x = margin_x;
        self.margin_y = margin_y;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Extent along sheet X and sheet Y.
    pub fn size(&self) -> (f64, f64) {
        match self.rotation {
            Rotation::Horizontal => (self.length, self.width),
            Rotation::Vertical => (self.width, self.length),
        }
    }

    pub fn bounds(&self) -> Bounds {
        let (sx, sy) = self.size();
        Bounds::from_origin_size(self.top_left, sx, sy)
    }

    /// Bounds grown by the shape's own clearance margin.
    pub fn inflated_bounds(&self) -> Bounds {
        self.bounds().inflate(self.margin_x, self.margin_y)
    }

    pub fn has_margin(&self) -> bool {
        self.margin_x != 0.0 || self.margin_y != 0.0
    }

    pub fn run_axis(&self) -> Axis {
        self.rotation.run_axis()
    }

    /// Leading edge along the run axis.
    pub fn run_start(&self) -> f64 {
        self.top_left.along(self.run_axis())
    }

    /// Trailing edge along the run axis.
    pub fn run_end(&self) -> f64 {
        self.run_start() + self.length
    }

    pub fn cross_start(&self) -> f64 {
        self.top_left.along(self.rotation.cross_axis())
    }

    pub fn cross_end(&self) -> f64 {
        self.cross_start() + self.width
    }

    pub fn translate(&mut self, offset: Offset) {
        self.top_left = self.top_left.translated(offset);
    }

    pub fn move_to(&mut self, top_left: Point) {
        self.top_left = top_left;
    }

    pub fn as_rack(&self) -> Option<&Rack> {
        match &self.kind {
            ShapeKind::Rack(rack) => Some(rack),
            _ => None,
        }
    }

    pub fn as_rack_mut(&mut self) -> Option<&mut Rack> {
        match &mut self.kind {
            ShapeKind::Rack(rack) => Some(rack),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match &self.kind {
            ShapeKind::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_column_mut(&mut self) -> Option<&mut Column> {
        match &mut self.kind {
            ShapeKind::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_tie_beam(&self) -> Option<&TieBeam> {
        match &self.kind {
            ShapeKind::TieBeam(beam) => Some(beam),
            _ => None,
        }
    }

    pub fn is_rack(&self) -> bool {
        matches!(self.kind, ShapeKind::Rack(_))
    }

    /// Size index of a rack or column.
    pub fn size_index(&self) -> Option<usize> {
        match &self.kind {
            ShapeKind::Rack(rack) => rack.size_index,
            ShapeKind::Column(column) => column.size_index,
            _ => None,
        }
    }

    /// Records that the shape was structurally edited by command `token`.
    pub fn touch(&mut self, token: u64) {
        match &mut self.kind {
            ShapeKind::Rack(rack) => rack.change_order = token,
            ShapeKind::Column(column) => column.change_order = token,
            _ => {}
        }
    }

    pub fn change_order(&self) -> u64 {
        match &self.kind {
            ShapeKind::Rack(rack) => rack.change_order,
            ShapeKind::Column(column) => column.change_order,
            _ => 0,
        }
    }

    /// Structural signature of a rack; `frame_offset` is stripped from master
    /// racks so the bay length compares equal across M and A racks.
    pub fn rack_signature(&self, frame_offset: f64) -> Option<RackSignature> {
        let rack = self.as_rack()?;
        let bay_length = if rack.is_first_in_row_column {
            self.length - frame_offset
        } else {
            self.length
        };
        Some(RackSignature::new(
            rack,
            bay_length,
            self.width,
            self.height,
        ))
    }

    pub fn column_signature(&self) -> Option<ColumnSignature> {
        let column = self.as_column()?;
        Some(ColumnSignature::new(
            column,
            self.length,
            self.width,
            self.height,
        ))
    }

    /// Checks dimensions and kind specific constraints of a user supplied shape.
    pub fn validate(&self, frame_offset: f64) -> rackplan_core::Result<()> {
        let finite = [
            self.top_left.x,
            self.top_left.y,
            self.length,
            self.width,
            self.height,
            self.margin_x,
            self.margin_y,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(LayoutError::invalid("coordinates must be finite"));
        }
        if self.length <= 0.0 || self.width <= 0.0 {
            return Err(LayoutError::invalid(format!(
                "{} must have a positive footprint",
                self.name
            )));
        }
        if self.height < 0.0 || self.margin_x < 0.0 || self.margin_y < 0.0 {
            return Err(LayoutError::invalid("height and margins must be >= 0"));
        }
        match &self.kind {
            ShapeKind::Rack(rack) => {
                if self.height <= 0.0 {
                    return Err(LayoutError::invalid("rack height must be > 0"));
                }
                let bay = if rack.is_first_in_row_column {
                    self.length - frame_offset
                } else {
                    self.length
                };
                if bay <= 0.0 {
                    return Err(LayoutError::invalid(format!(
                        "rack length {} does not exceed frame offset {}",
                        self.length, frame_offset
                    )));
                }
                rack.config.validate(self.height)
            }
            ShapeKind::TieBeam(_) => Err(LayoutError::invalid(
                "tie beams are derived and cannot be placed",
            )),
            _ => Ok(()),
        }
    }
}
