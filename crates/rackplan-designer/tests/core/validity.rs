use std::collections::HashSet;

use rackplan_designer::validity::{
    find_non_overlapping_position, is_valid, shapes_conflict, ConflictTarget, Repair, Validity,
};
use rackplan_designer::{Bounds, Point, Rotation, Shape, ShapeId};
use rackplan_settings::LayoutSettings;

fn with_id(mut shape: Shape, id: ShapeId) -> Shape {
    shape.id = id;
    shape
}

fn rack(id: ShapeId, x: f64, y: f64) -> Shape {
    with_id(
        Shape::rack(x, y, 1000.0, 1000.0, 5000.0, Rotation::Horizontal),
        id,
    )
}

fn sheet() -> Bounds {
    Bounds::new(0.0, 0.0, 10000.0, 10000.0)
}

#[test]
fn test_touching_racks_do_not_conflict() {
    let settings = LayoutSettings::default();
    assert!(!shapes_conflict(&rack(1, 0.0, 0.0), &rack(2, 1000.0, 0.0), &settings));
    assert!(shapes_conflict(&rack(1, 0.0, 0.0), &rack(2, 999.0, 0.0), &settings));
}

#[test]
fn test_rack_conflicts_with_every_kind_but_fixtures() {
    let settings = LayoutSettings::default();
    let r = rack(1, 0.0, 0.0);
    let overlapping = [
        with_id(Shape::block(500.0, 500.0, 1000.0, 1000.0), 2),
        with_id(Shape::aisle(500.0, 500.0, 1000.0, 1000.0), 3),
        with_id(Shape::column(500.0, 500.0, 300.0, 300.0, 9000.0, "HEA300"), 4),
        with_id(Shape::shutter(500.0, 500.0, 1000.0, 400.0, Rotation::Horizontal), 5),
    ];
    for other in &overlapping {
        assert!(shapes_conflict(&r, other, &settings), "{:?}", other.kind);
    }

    let wall = with_id(Shape::wall(500.0, 500.0, 3000.0, 200.0, Rotation::Horizontal), 6);
    let marker = with_id(Shape::marker(500.0, 500.0, "A1"), 7);
    assert!(!shapes_conflict(&r, &wall, &settings));
    assert!(!shapes_conflict(&r, &marker, &settings));
}

#[test]
fn test_shutter_rules() {
    let settings = LayoutSettings::default();
    let shutter = with_id(Shape::shutter(0.0, 0.0, 2000.0, 500.0, Rotation::Horizontal), 1);
    let aisle = with_id(Shape::aisle(0.0, 0.0, 2000.0, 3000.0), 2);
    let block = with_id(Shape::block(0.0, 0.0, 500.0, 500.0), 3);
    let wall = with_id(Shape::wall(0.0, 0.0, 2000.0, 200.0, Rotation::Horizontal), 4);
    let other_shutter = with_id(Shape::shutter(1000.0, 0.0, 2000.0, 500.0, Rotation::Horizontal), 5);

    assert!(!shapes_conflict(&shutter, &aisle, &settings));
    assert!(!shapes_conflict(&shutter, &block, &settings));
    assert!(!shapes_conflict(&shutter, &wall, &settings));
    assert!(shapes_conflict(&shutter, &other_shutter, &settings));
}

#[test]
fn test_same_family_only_for_other_kinds() {
    let settings = LayoutSettings::default();
    let aisle = with_id(Shape::aisle(0.0, 0.0, 2000.0, 2000.0), 1);
    let other_aisle = with_id(Shape::aisle(1000.0, 0.0, 2000.0, 2000.0), 2);
    let block = with_id(Shape::block(500.0, 500.0, 500.0, 500.0), 3);

    assert!(shapes_conflict(&aisle, &other_aisle, &settings));
    assert!(!shapes_conflict(&aisle, &block, &settings));
}

#[test]
fn test_larger_margin_applies() {
    let settings = LayoutSettings::default();
    let a = with_id(Shape::block(0.0, 0.0, 1000.0, 1000.0).with_margin(50.0, 0.0), 1);
    let b = with_id(Shape::block(1100.0, 0.0, 1000.0, 1000.0).with_margin(150.0, 0.0), 2);
    assert!(shapes_conflict(&a, &b, &settings));
    assert!(shapes_conflict(&b, &a, &settings));
}

#[test]
fn test_ignore_set_and_uninitialized_shapes_are_skipped() {
    let settings = LayoutSettings::default();
    let candidate = rack(1, 0.0, 0.0);
    let mut pending = rack(3, 500.0, 0.0);
    pending.initialized = false;
    let others = vec![rack(2, 500.0, 0.0), pending];

    let mut ignore = HashSet::new();
    let validity = is_valid(&[&candidate], &others, &ignore, &sheet(), &settings);
    assert_eq!(validity.conflicting_shapes(), vec![2]);

    ignore.insert(2);
    assert_eq!(
        is_valid(&[&candidate], &others, &ignore, &sheet(), &settings),
        Validity::Ok
    );
}

#[test]
fn test_margin_box_must_stay_on_sheet() {
    let settings = LayoutSettings::default();
    let block = with_id(Shape::block(0.0, 0.0, 1000.0, 1000.0).with_margin(10.0, 10.0), 1);
    let validity = is_valid(&[&block], &[], &HashSet::new(), &sheet(), &settings);
    assert!(validity
        .conflicts()
        .iter()
        .any(|c| c.target == ConflictTarget::SheetBorder));

    let wall = with_id(Shape::wall(-100.0, 0.0, 5000.0, 200.0, Rotation::Horizontal), 2);
    assert!(is_valid(&[&wall], &[], &HashSet::new(), &sheet(), &settings).is_ok());
}

#[test]
fn test_repair_clears_chain_of_conflicts() {
    let settings = LayoutSettings::default();
    let others = vec![rack(1, 1000.0, 1000.0), rack(2, 2000.0, 1000.0)];
    let candidate = rack(3, 1400.0, 1000.0);

    let repair = find_non_overlapping_position(
        &candidate,
        &[1],
        &others,
        &HashSet::new(),
        &sheet(),
        &settings,
    );
    let Repair::Repaired(point) = repair else {
        panic!("expected a repaired position");
    };
    let mut placed = candidate.clone();
    placed.move_to(point);
    assert!(is_valid(&[&placed], &others, &HashSet::new(), &sheet(), &settings).is_ok());
    assert_ne!(point, Point::new(1400.0, 1000.0));
}

#[test]
fn test_repair_rejects_shape_larger_than_sheet() {
    let settings = LayoutSettings::default();
    let huge = with_id(Shape::block(0.0, 0.0, 20000.0, 100.0), 1);
    let repair = find_non_overlapping_position(
        &huge,
        &[],
        &[],
        &HashSet::new(),
        &sheet(),
        &settings,
    );
    assert_eq!(repair, Repair::Unrepairable);
}
