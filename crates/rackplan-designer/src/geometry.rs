//! Points, axis aligned bounds and orientation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translated(&self, offset: Offset) -> Self {
        Self::new(self.x + offset.dx, self.y + offset.dy)
    }

    /// Coordinate along `axis`.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn set_along(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }
}

/// A displacement in sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Orientation of a shape on the sheet.
///
/// A horizontal shape runs along X: its length maps to the X extent and its
/// width to the Y extent. A vertical shape swaps the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Horizontal,
    Vertical,
}

impl Rotation {
    /// Axis along which the shape's length is measured.
    pub fn run_axis(self) -> Axis {
        match self {
            Rotation::Horizontal => Axis::X,
            Rotation::Vertical => Axis::Y,
        }
    }

    pub fn cross_axis(self) -> Axis {
        self.run_axis().other()
    }

    pub fn turned(self) -> Self {
        match self {
            Rotation::Horizontal => Rotation::Vertical,
            Rotation::Vertical => Rotation::Horizontal,
        }
    }
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    pub fn from_origin_size(origin: Point, size_x: f64, size_y: f64) -> Self {
        Self::new(origin.x, origin.y, origin.x + size_x, origin.y + size_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.min_x,
            Axis::Y => self.min_y,
        }
    }

    pub fn end(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.max_x,
            Axis::Y => self.max_y,
        }
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self.end(axis) - self.start(axis)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// True when `other` lies inside `self`, allowing `epsilon` of slack.
    pub fn contains(&self, other: &Bounds, epsilon: f64) -> bool {
        other.min_x >= self.min_x - epsilon
            && other.min_y >= self.min_y - epsilon
            && other.max_x <= self.max_x + epsilon
            && other.max_y <= self.max_y + epsilon
    }

    /// True when the interiors overlap by more than `epsilon` on both axes.
    /// Touching edges do not intersect.
    pub fn intersects(&self, other: &Bounds, epsilon: f64) -> bool {
        self.overlap_along(other, Axis::X) > epsilon && self.overlap_along(other, Axis::Y) > epsilon
    }

    /// Length of the shared interval along `axis`, negative for a gap.
    pub fn overlap_along(&self, other: &Bounds, axis: Axis) -> f64 {
        self.end(axis).min(other.end(axis)) - self.start(axis).max(other.start(axis))
    }

    pub fn inflate(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn translate(&self, offset: Offset) -> Self {
        Self {
            min_x: self.min_x + offset.dx,
            min_y: self.min_y + offset.dy,
            max_x: self.max_x + offset.dx,
            max_y: self.max_y + offset.dy,
        }
    }

    /// Union of all bounds, `None` for an empty iterator.
    pub fn union_all<'a>(bounds: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        bounds
            .into_iter()
            .copied()
            .reduce(|acc, b| acc.union(&b))
    }
}
