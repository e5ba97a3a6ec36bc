//! Spatial validity checking and conflict repair.
//!
//! Overlap rules per kind pair:
//! 1. sheet markers and tie beams never conflict;
//! 2. walls never conflict (shutters sit in walls);
//! 3. a shutter may overlap an aisle space;
//! 4. a nonzero margin on either side is tested against the margin inflated
//!    box, except along the run axis of two racks lined up in one row;
//! 5. a rack conflicts with any overlapping shape;
//! 6. a shutter only conflicts with another shutter;
//! 7. everything else only conflicts within its own family.
//!
//! Non-wall candidates must also stay inside the sheet with their margins.

use std::collections::HashSet;

use rackplan_core::ShapeId;
use rackplan_settings::LayoutSettings;

use crate::geometry::{Axis, Bounds, Offset, Point};
use crate::model::{LayoutRules, Shape, ShapeType};

/// What a candidate collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictTarget {
    Shape(ShapeId),
    SheetBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conflict {
    pub candidate: ShapeId,
    pub target: ConflictTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Ok,
    Conflicts(Vec<Conflict>),
}

impl Validity {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validity::Ok)
    }

    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Validity::Ok => &[],
            Validity::Conflicts(conflicts) => conflicts,
        }
    }

    /// Distinct shapes hit by any candidate, in discovery order.
    pub fn conflicting_shapes(&self) -> Vec<ShapeId> {
        let mut seen = HashSet::new();
        self.conflicts()
            .iter()
            .filter_map(|c| match c.target {
                ConflictTarget::Shape(id) => Some(id),
                ConflictTarget::SheetBorder => None,
            })
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn hits_border(&self) -> bool {
        self.conflicts()
            .iter()
            .any(|c| c.target == ConflictTarget::SheetBorder)
    }
}

/// Outcome of the repair search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repair {
    Repaired(Point),
    Unrepairable,
}

/// Two racks that would line up in one row: same orientation, depth and cross offset.
pub fn are_row_neighbours(a: &Shape, b: &Shape, settings: &LayoutSettings) -> bool {
    a.is_rack()
        && b.is_rack()
        && a.rotation == b.rotation
        && (a.cross_start() - b.cross_start()).abs() <= settings.alignment_tolerance
        && (a.width - b.width).abs() <= settings.alignment_tolerance
}

fn kinds_conflict(a: &Shape, b: &Shape) -> bool {
    if a.is_overlap_exempt() || b.is_overlap_exempt() {
        return false;
    }
    if a.is_boundary_fixture() || b.is_boundary_fixture() {
        return false;
    }

    let (ta, tb) = (a.shape_type(), b.shape_type());
    if matches!(
        (ta, tb),
        (ShapeType::Shutter, ShapeType::AisleSpace) | (ShapeType::AisleSpace, ShapeType::Shutter)
    ) {
        return false;
    }

    if ta == ShapeType::Rack || tb == ShapeType::Rack {
        true
    } else if ta == ShapeType::Shutter || tb == ShapeType::Shutter {
        ta == tb
    } else {
        a.family() == b.family()
    }
}

/// Clearance `a` and `b` must keep from each other, per sheet axis.
fn required_clearance(a: &Shape, b: &Shape, settings: &LayoutSettings) -> (f64, f64) {
    let mut mx = a.margin_x.max(b.margin_x);
    let mut my = a.margin_y.max(b.margin_y);
    if are_row_neighbours(a, b, settings) {
        match a.run_axis() {
            Axis::X => mx = 0.0,
            Axis::Y => my = 0.0,
        }
    }
    (mx, my)
}

/// Pairwise conflict test.
pub fn shapes_conflict(a: &Shape, b: &Shape, settings: &LayoutSettings) -> bool {
    if !kinds_conflict(a, b) {
        return false;
    }
    let eps = settings.overlap_epsilon;
    if a.has_margin() || b.has_margin() {
        let (mx, my) = required_clearance(a, b, settings);
        a.bounds().inflate(mx, my).intersects(&b.bounds(), eps)
    } else {
        a.bounds().intersects(&b.bounds(), eps)
    }
}

/// Whether a shape sits inside the sheet with its margins.
pub fn within_sheet(shape: &Shape, sheet_bounds: &Bounds, settings: &LayoutSettings) -> bool {
    shape.is_boundary_fixture()
        || shape.is_overlap_exempt()
        || sheet_bounds.contains(&shape.inflated_bounds(), settings.overlap_epsilon)
}

/// Checks `candidates` against every committed shape in `others` that is not
/// in `ignore`. A candidate is never compared with the registry copy of itself,
/// so hypothetical positions can be checked before they are applied.
pub fn is_valid(
    candidates: &[&Shape],
    others: &[Shape],
    ignore: &HashSet<ShapeId>,
    sheet_bounds: &Bounds,
    settings: &LayoutSettings,
) -> Validity {
    let mut conflicts = Vec::new();
    for candidate in candidates {
        if candidate.is_overlap_exempt() || candidate.is_boundary_fixture() {
            continue;
        }
        if !within_sheet(candidate, sheet_bounds, settings) {
            conflicts.push(Conflict {
                candidate: candidate.id,
                target: ConflictTarget::SheetBorder,
            });
        }
        for other in others {
            if other.id == candidate.id || !other.initialized || ignore.contains(&other.id) {
                continue;
            }
            if shapes_conflict(candidate, other, settings) {
                conflicts.push(Conflict {
                    candidate: candidate.id,
                    target: ConflictTarget::Shape(other.id),
                });
            }
        }
    }

    if conflicts.is_empty() {
        Validity::Ok
    } else {
        Validity::Conflicts(conflicts)
    }
}

/// Moves `shape` inside the sheet. Returns false if it cannot fit at all.
fn clamp_into_sheet(shape: &mut Shape, sheet_bounds: &Bounds) -> bool {
    let b = shape.inflated_bounds();
    if b.width() > sheet_bounds.width() || b.height() > sheet_bounds.height() {
        return false;
    }
    let dx = if b.min_x < sheet_bounds.min_x {
        sheet_bounds.min_x - b.min_x
    } else if b.max_x > sheet_bounds.max_x {
        sheet_bounds.max_x - b.max_x
    } else {
        0.0
    };
    let dy = if b.min_y < sheet_bounds.min_y {
        sheet_bounds.min_y - b.min_y
    } else if b.max_y > sheet_bounds.max_y {
        sheet_bounds.max_y - b.max_y
    } else {
        0.0
    };
    shape.translate(Offset::new(dx, dy));
    true
}

/// Greedy local search for a position of `shape` that clears `conflicts`.
///
/// Each iteration slides the shape by the shortest axis move that clears the
/// union of every keep-out box seen so far and re-checks it. The search stops
/// after `settings.repair_max_iterations` attempts.
pub fn find_non_overlapping_position(
    shape: &Shape,
    conflicts: &[ShapeId],
    others: &[Shape],
    ignore: &HashSet<ShapeId>,
    sheet_bounds: &Bounds,
    settings: &LayoutSettings,
) -> Repair {
    let mut candidate = shape.clone();
    let mut keep_out: Vec<(ShapeId, Bounds)> = Vec::new();
    let add_keep_out = |ids: &[ShapeId], keep_out: &mut Vec<(ShapeId, Bounds)>| {
        for id in ids {
            if keep_out.iter().any(|(k, _)| k == id) {
                continue;
            }
            if let Some(other) = others.iter().find(|o| o.id == *id) {
                let (mx, my) = required_clearance(shape, other, settings);
                keep_out.push((*id, other.bounds().inflate(mx, my)));
            }
        }
    };
    add_keep_out(conflicts, &mut keep_out);

    for iteration in 0..settings.repair_max_iterations {
        if !clamp_into_sheet(&mut candidate, sheet_bounds) {
            tracing::debug!("shape {} does not fit on the sheet", shape.id);
            return Repair::Unrepairable;
        }

        match is_valid(&[&candidate], others, ignore, sheet_bounds, settings) {
            Validity::Ok => {
                tracing::debug!(
                    "repaired shape {} after {} iteration(s)",
                    shape.id,
                    iteration
                );
                return Repair::Repaired(candidate.top_left);
            }
            found => add_keep_out(&found.conflicting_shapes(), &mut keep_out),
        }

        let Some(union) = Bounds::union_all(keep_out.iter().map(|(_, b)| b)) else {
            // Only the border was in the way and clamping did not help.
            return Repair::Unrepairable;
        };

        let b = candidate.bounds();
        let mut moves = [
            Offset::new(union.min_x - b.max_x, 0.0),
            Offset::new(union.max_x - b.min_x, 0.0),
            Offset::new(0.0, union.min_y - b.max_y),
            Offset::new(0.0, union.max_y - b.min_y),
        ];
        moves.sort_by(|a, b| a.length().total_cmp(&b.length()));

        let next = moves.iter().find(|m| {
            sheet_bounds.contains(
                &candidate.inflated_bounds().translate(**m),
                settings.overlap_epsilon,
            )
        });
        match next {
            Some(offset) => candidate.translate(*offset),
            None => return Repair::Unrepairable,
        }
    }

    tracing::warn!(
        "no valid position for shape {} within {} iterations",
        shape.id,
        settings.repair_max_iterations
    );
    Repair::Unrepairable
}
