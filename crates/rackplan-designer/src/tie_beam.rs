//! Tie beam placement.
//!
//! Slender racks facing each other across a narrow aisle are tied together
//! with beams running over the aisle at their frames. Beams are derived data:
//! they are recomputed from scratch for the whole sheet after every change.

use smallvec::SmallVec;

use rackplan_core::ShapeId;
use rackplan_settings::{LayoutSettings, TieBeamSettings};

use crate::geometry::{Point, Rotation};
use crate::model::{FrameEnd, LayoutRules, Shape, ShapeKind, ShapeType, TieBeam};
use crate::rack_settings::RackSettings;
use crate::registry::ShapeRegistry;

/// Beams and error racks of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieBeamResult {
    pub beams: Vec<Shape>,
    /// Racks that need a beam which would not fit under the clear height,
    /// sorted and unique.
    pub errors: Vec<ShapeId>,
}

struct Side<'a> {
    near: Vec<&'a Shape>,
    far: Vec<&'a Shape>,
}

fn structural_start(rack: &Shape, frame_offset: f64) -> f64 {
    match rack.as_rack() {
        Some(payload) if !payload.is_master() => rack.run_start() - frame_offset,
        _ => rack.run_start(),
    }
}

fn is_slender(rack: &Shape, ratio: f64) -> bool {
    rack.width > 0.0 && rack.height / rack.width > ratio
}

/// Racks of `orientation` whose fronts face the two long edges of `aisle`.
fn facing_racks<'a>(
    aisle: &Shape,
    racks: &[&'a Shape],
    orientation: Rotation,
    clearance: f64,
    layout: &LayoutSettings,
) -> Side<'a> {
    let cross = orientation.cross_axis();
    let run = orientation.run_axis();
    let aisle_bounds = aisle.bounds();

    let mut side = Side {
        near: Vec::new(),
        far: Vec::new(),
    };
    for rack in racks.iter().filter(|r| r.rotation == orientation) {
        let b = rack.bounds();
        if b.overlap_along(&aisle_bounds, run) <= layout.overlap_epsilon {
            continue;
        }
        let near_gap = aisle_bounds.start(cross) - b.end(cross);
        let far_gap = b.start(cross) - aisle_bounds.end(cross);
        if (-layout.alignment_tolerance..=clearance).contains(&near_gap) {
            side.near.push(rack);
        } else if (-layout.alignment_tolerance..=clearance).contains(&far_gap) {
            side.far.push(rack);
        }
    }
    side
}

/// Recomputes every tie beam on a sheet.
pub fn recompute(
    shapes: &ShapeRegistry,
    rack_settings: &RackSettings,
    settings: &TieBeamSettings,
    layout: &LayoutSettings,
) -> TieBeamResult {
    let clearance = rack_settings.back_clearance() + layout.alignment_tolerance;
    let racks: Vec<&Shape> = shapes.racks().collect();
    let aisles = shapes
        .iter()
        .filter(|s| s.initialized && s.shape_type() == ShapeType::AisleSpace);

    let mut beams: Vec<Shape> = Vec::new();
    let mut errors: Vec<ShapeId> = Vec::new();

    for aisle in aisles {
        let first_beam = beams.len();
        for orientation in [Rotation::Horizontal, Rotation::Vertical] {
            let cross = orientation.cross_axis();
            let run = orientation.run_axis();
            let aisle_bounds = aisle.bounds();
            let span = aisle_bounds.extent(cross);
            if span <= 0.0 || span > settings.max_span {
                continue;
            }

            let side = facing_racks(aisle, &racks, orientation, clearance, layout);
            if side.near.is_empty() || side.far.is_empty() {
                continue;
            }

            for near in &side.near {
                for far in &side.far {
                    if near.bounds().overlap_along(&far.bounds(), run) <= layout.overlap_epsilon {
                        continue;
                    }
                    if !is_slender(near, settings.height_depth_ratio)
                        && !is_slender(far, settings.height_depth_ratio)
                    {
                        continue;
                    }

                    let too_tall: SmallVec<[ShapeId; 2]> = [near, far]
                        .iter()
                        .filter(|r| r.height + rack_settings.tie_beam_height > rack_settings.clear_height)
                        .map(|r| r.id)
                        .collect();
                    if !too_tall.is_empty() {
                        errors.extend(too_tall);
                        continue;
                    }

                    let frames = aligned_frames(near, far, rack_settings.frame_offset, settings);
                    for (frame, position) in frames {
                        let duplicate = beams[first_beam..].iter().any(|beam| {
                            beam.as_tie_beam().is_some_and(|t| {
                                t.aisle == aisle.id
                                    && (t.frame_position - position).abs() < settings.beam_width
                            })
                        });
                        if duplicate {
                            continue;
                        }
                        let mut beam = beam_shape(
                            aisle.id,
                            (*near, *far),
                            frame,
                            position,
                            orientation,
                            rack_settings,
                            settings,
                        );
                        beam.id = beams.len() as ShapeId + 1;
                        beams.push(beam);
                    }
                }
            }
        }
    }

    errors.sort_unstable();
    errors.dedup();
    if !errors.is_empty() {
        tracing::warn!("{} rack(s) cannot take a tie beam under the clear height", errors.len());
    }
    TieBeamResult { beams, errors }
}

/// Frame pairs of two opposing racks that line up within tolerance.
fn aligned_frames(
    near: &Shape,
    far: &Shape,
    frame_offset: f64,
    settings: &TieBeamSettings,
) -> SmallVec<[(FrameEnd, f64); 2]> {
    let mut frames = SmallVec::new();
    let starts = (
        structural_start(near, frame_offset),
        structural_start(far, frame_offset),
    );
    let ends = (near.run_end(), far.run_end());
    for (frame, (a, b)) in [(FrameEnd::Start, starts), (FrameEnd::End, ends)] {
        if (a - b).abs() <= settings.frame_align_tolerance {
            frames.push((frame, (a + b) / 2.0));
        }
    }
    frames
}

fn beam_shape(
    aisle: ShapeId,
    (near, far): (&Shape, &Shape),
    frame: FrameEnd,
    position: f64,
    orientation: Rotation,
    rack_settings: &RackSettings,
    settings: &TieBeamSettings,
) -> Shape {
    let cross = orientation.cross_axis();
    let from = near.bounds().end(cross);
    let to = far.bounds().start(cross);

    let mut top_left = Point::new(0.0, 0.0);
    top_left.set_along(cross, from);
    top_left.set_along(orientation.run_axis(), position - settings.beam_width / 2.0);

    Shape::new(
        ShapeKind::TieBeam(TieBeam {
            aisle,
            racks: (near.id, far.id),
            frame,
            frame_position: position,
        }),
        top_left,
        (to - from).max(0.0),
        settings.beam_width,
        rack_settings.tie_beam_height,
        orientation.turned(),
    )
}
