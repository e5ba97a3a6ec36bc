use rackplan_designer::tie_beam::recompute;
use rackplan_designer::{FrameEnd, RackSettings, Rotation, Shape, ShapeRegistry};
use rackplan_settings::{LayoutSettings, TieBeamSettings};

fn registry(shapes: Vec<Shape>) -> ShapeRegistry {
    let mut registry = ShapeRegistry::new();
    for shape in shapes {
        registry.add(shape);
    }
    registry
}

fn beams_of(shapes: Vec<Shape>, rack_settings: &RackSettings) -> Vec<Shape> {
    recompute(
        &registry(shapes),
        rack_settings,
        &TieBeamSettings::default(),
        &LayoutSettings::default(),
    )
    .beams
}

/// (position, span start, span length, frame) of every beam.
fn geometry(beams: &[Shape]) -> Vec<(f64, f64, f64, FrameEnd)> {
    let mut out: Vec<_> = beams
        .iter()
        .filter_map(|b| {
            let tie = b.as_tie_beam()?;
            Some((tie.frame_position, b.cross_start(), b.length, tie.frame))
        })
        .collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

#[test]
fn test_beams_do_not_depend_on_drawing_order() {
    let settings = RackSettings::default();
    let near = Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal);
    let aisle = Shape::aisle(0.0, 1000.0, 2800.0, 3000.0);
    let far = Shape::rack(0.0, 4000.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal);

    let forward = beams_of(vec![near.clone(), aisle.clone(), far.clone()], &settings);
    let backward = beams_of(vec![far, aisle, near], &settings);

    assert_eq!(forward.len(), 2);
    assert_eq!(geometry(&forward), geometry(&backward));
}

#[test]
fn test_one_slender_rack_is_enough() {
    let settings = RackSettings::default();
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 1000.0, 2800.0, 3000.0),
            Shape::rack(0.0, 4000.0, 2800.0, 2000.0, 8000.0, Rotation::Horizontal),
        ],
        &settings,
    );
    assert_eq!(beams.len(), 2);

    let stocky = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 2000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 2000.0, 2800.0, 3000.0),
            Shape::rack(0.0, 5000.0, 2800.0, 2000.0, 8000.0, Rotation::Horizontal),
        ],
        &settings,
    );
    assert!(stocky.is_empty());
}

#[test]
fn test_misaligned_frames_get_no_beam() {
    let settings = RackSettings::default();
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 1000.0, 3000.0, 3000.0),
            Shape::rack(200.0, 4000.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
        ],
        &settings,
    );
    assert!(beams.is_empty());
}

#[test]
fn test_overhang_gap_still_faces_aisle() {
    let settings = RackSettings::default();
    // Far rack sits 50 mm (the pallet overhang) back from the aisle edge.
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 1000.0, 2800.0, 3000.0),
            Shape::rack(0.0, 4050.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
        ],
        &settings,
    );
    assert_eq!(beams.len(), 2);
    assert_eq!(beams[0].length, 3050.0);

    let flush = RackSettings {
        pallets_flush: true,
        ..RackSettings::default()
    };
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 1000.0, 2800.0, 3000.0),
            Shape::rack(0.0, 4050.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
        ],
        &flush,
    );
    assert!(beams.is_empty());
}

#[test]
fn test_vertical_racks_get_horizontal_beams() {
    let settings = RackSettings::default();
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Vertical),
            Shape::aisle(1000.0, 0.0, 3000.0, 2800.0),
            Shape::rack(4000.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Vertical),
        ],
        &settings,
    );
    assert_eq!(beams.len(), 2);
    assert!(beams.iter().all(|b| b.rotation == Rotation::Horizontal));
    assert_eq!(beams[0].bounds().min_x, 1000.0);
    assert_eq!(beams[0].bounds().max_x, 4000.0);
}

#[test]
fn test_beam_ids_are_sequential() {
    let settings = RackSettings::default();
    let beams = beams_of(
        vec![
            Shape::rack(0.0, 0.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
            Shape::aisle(0.0, 1000.0, 2800.0, 3000.0),
            Shape::rack(0.0, 4000.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal),
        ],
        &settings,
    );
    let ids: Vec<u64> = beams.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 2]);
}
