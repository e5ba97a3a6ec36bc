use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use rackplan_core::{AppEvent, DiagnosticEvent, EventCategory, EventFilter, HistoryEvent};
use rackplan_designer::validity::{shapes_conflict, within_sheet};
use rackplan_designer::{
    BeamLevel, DrawingDocument, LayoutError, Offset, Point, RackConfig, RackSettings, Rotation,
    Shape, ShapeKind,
};
use rackplan_settings::{EngineConfig, LayoutSettings};

fn document() -> (DrawingDocument, usize) {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Hall A", 10000.0, 10000.0).expect("sheet");
    (doc, sheet)
}

fn rack(x: f64, y: f64, height: f64) -> Shape {
    Shape::rack(x, y, 1000.0, 1000.0, height, Rotation::Horizontal)
}

#[test]
fn test_adjacent_racks_share_a_group() {
    let (mut doc, sheet) = document();
    let first = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let second = doc.create_shape(sheet, rack(1050.0, 0.0, 5000.0)).unwrap();

    let groups = doc.rack_groups(sheet).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].racks, vec![first, second]);

    let second_shape = doc.shape(sheet, second).unwrap();
    assert_eq!(second_shape.as_rack().map(|r| r.is_master()), Some(false));
    assert_eq!(second_shape.run_end(), 2050.0);
    assert_eq!(second_shape.length, 920.0);
}

#[test]
fn test_move_is_clamped_to_sheet() {
    let (mut doc, sheet) = document();
    let id = doc.create_shape(sheet, rack(6000.0, 0.0, 5000.0)).unwrap();
    doc.select(sheet, &[id]).unwrap();

    let applied = doc.move_selection(Offset::new(5000.0, 0.0)).unwrap();
    assert_eq!(applied, Offset::new(3000.0, 0.0));
    assert_eq!(doc.shape(sheet, id).unwrap().bounds().max_x, 10000.0);
}

#[test]
fn test_move_onto_another_shape_is_rejected() {
    let (mut doc, sheet) = document();
    let moving = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    doc.create_shape(sheet, rack(0.0, 3000.0, 5000.0)).unwrap();
    doc.select(sheet, &[moving]).unwrap();
    let before = doc.snapshot();

    let err = doc.move_selection(Offset::new(0.0, 2500.0)).unwrap_err();
    assert!(matches!(err, LayoutError::LayoutConflict { shape, .. } if shape == moving));
    assert_eq!(doc.state(), &before);
}

#[test]
fn test_move_without_selection_fails() {
    let (mut doc, _) = document();
    assert_eq!(
        doc.move_selection(Offset::new(10.0, 0.0)),
        Err(LayoutError::NoSelection)
    );
}

#[test]
fn test_freed_size_index_is_reused() {
    let (mut doc, sheet) = document();
    let a = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let b = doc.create_shape(sheet, rack(0.0, 3000.0, 6000.0)).unwrap();
    let c = doc.create_shape(sheet, rack(0.0, 6000.0, 7000.0)).unwrap();
    assert_eq!(doc.size_index(sheet, a).unwrap(), Some(1));
    assert_eq!(doc.size_index(sheet, b).unwrap(), Some(2));
    assert_eq!(doc.size_index(sheet, c).unwrap(), Some(3));

    assert_eq!(doc.delete_shapes(sheet, &[b]).unwrap(), 1);
    let d = doc.create_shape(sheet, rack(5000.0, 3000.0, 8000.0)).unwrap();
    assert_eq!(doc.size_index(sheet, d).unwrap(), Some(2));
}

#[test]
fn test_identical_racks_share_an_index() {
    let (mut doc, sheet) = document();
    let a = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let b = doc.create_shape(sheet, rack(0.0, 3000.0, 5000.0)).unwrap();
    assert_eq!(doc.size_index(sheet, a).unwrap(), doc.size_index(sheet, b).unwrap());
    assert_eq!(doc.state().rack_sizes.len(), 1);

    doc.modify_shape(sheet, b, |shape| shape.height = 6000.0).unwrap();
    assert_eq!(doc.size_index(sheet, b).unwrap(), Some(2));
    assert_eq!(doc.state().rack_sizes.len(), 2);
}

#[test]
fn test_undo_redo_round_trip() {
    let (mut doc, sheet) = document();
    doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let one_rack = doc.snapshot();
    doc.create_shape(sheet, rack(1050.0, 0.0, 5000.0)).unwrap();
    let two_racks = doc.snapshot();

    assert!(doc.undo().unwrap());
    assert_eq!(doc.state(), &one_rack);
    assert!(doc.redo().unwrap());
    assert_eq!(doc.state(), &two_racks);
    assert!(!doc.redo().unwrap());
}

#[test]
fn test_new_command_after_undo_drops_redo() {
    let (mut doc, sheet) = document();
    doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    doc.undo().unwrap();
    assert!(doc.can_redo());

    doc.create_shape(sheet, rack(0.0, 3000.0, 5000.0)).unwrap();
    assert!(!doc.can_redo());
}

#[test]
fn test_overlapping_create_is_moved_aside() {
    let (mut doc, sheet) = document();
    doc.create_shape(sheet, rack(1000.0, 1000.0, 5000.0)).unwrap();
    let id = doc.create_shape(sheet, rack(1500.0, 1000.0, 5000.0)).unwrap();

    let shape = doc.shape(sheet, id).unwrap();
    assert_eq!(shape.run_end(), 3000.0);
    assert_eq!(doc.rack_groups(sheet).unwrap().len(), 1);
}

#[test]
fn test_unplaceable_create_leaves_document_unchanged() {
    let (mut doc, sheet) = document();
    doc.create_shape(sheet, Shape::block(0.0, 0.0, 10000.0, 10000.0)).unwrap();
    let before = doc.snapshot();
    let depth = doc.undo_depth();

    let err = doc.create_shape(sheet, rack(100.0, 100.0, 5000.0)).unwrap_err();
    assert!(matches!(err, LayoutError::LayoutConflict { .. }));
    assert_eq!(doc.state(), &before);
    assert_eq!(doc.undo_depth(), depth);
}

#[test]
fn test_rack_taller_than_clear_height_is_rejected() {
    let (mut doc, sheet) = document();
    let err = doc.create_shape(sheet, rack(0.0, 0.0, 13000.0)).unwrap_err();
    assert!(matches!(err, LayoutError::HeightExceeded { clear_height, .. } if clear_height == 12000.0));
    assert!(doc.sheet(sheet).unwrap().shapes.is_empty());
}

#[test]
fn test_modify_cannot_change_kind() {
    let (mut doc, sheet) = document();
    let id = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let err = doc
        .modify_shape(sheet, id, |shape| shape.kind = ShapeKind::Block)
        .unwrap_err();
    assert!(matches!(err, LayoutError::InvalidShape { .. }));
    assert!(doc.shape(sheet, id).unwrap().is_rack());
}

#[test]
fn test_modify_rejects_invalid_levels() {
    let (mut doc, sheet) = document();
    let id = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let err = doc
        .modify_shape(sheet, id, |shape| {
            if let Some(rack) = shape.as_rack_mut() {
                rack.config = RackConfig {
                    levels: vec![BeamLevel {
                        elevation: 9000.0,
                        beam_profile: "B120".to_string(),
                        load_kg: 1000.0,
                    }],
                    ..RackConfig::default()
                };
            }
        })
        .unwrap_err();
    assert!(matches!(err, LayoutError::InvalidShape { .. }));
}

#[test]
fn test_uprights_are_selected_from_catalog() {
    let (mut doc, sheet) = document();
    let low = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let high = doc.create_shape(sheet, rack(0.0, 3000.0, 8000.0)).unwrap();

    let upright = |id| {
        doc.shape(sheet, id)
            .ok()
            .and_then(|s| s.as_rack())
            .and_then(|r| r.config.upright.clone())
    };
    assert_eq!(upright(low).as_deref(), Some("UP-70"));
    assert_eq!(upright(high).as_deref(), Some("UP-90"));
}

#[test]
fn test_frame_offset_change_moves_master_leading_edge() {
    let (mut doc, sheet) = document();
    let id = doc.create_shape(sheet, rack(1000.0, 0.0, 5000.0)).unwrap();
    doc.set_rack_settings(RackSettings {
        frame_offset: 100.0,
        ..RackSettings::default()
    })
    .unwrap();

    let shape = doc.shape(sheet, id).unwrap();
    assert_eq!(shape.length, 1020.0);
    assert_eq!(shape.run_start(), 980.0);
    assert_eq!(shape.run_end(), 2000.0);
}

#[test]
fn test_lower_frame_offset_keeps_row_together() {
    let (mut doc, sheet) = document();
    let first = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let second = doc.create_shape(sheet, rack(1050.0, 0.0, 5000.0)).unwrap();
    doc.set_rack_settings(RackSettings {
        frame_offset: 0.0,
        ..RackSettings::default()
    })
    .unwrap();

    assert_eq!(doc.rack_groups(sheet).unwrap()[0].racks, vec![first, second]);
    let master = doc.shape(sheet, first).unwrap();
    assert_eq!((master.run_start(), master.run_end()), (80.0, 1000.0));
    let follower = doc.shape(sheet, second).unwrap();
    assert_eq!(follower.as_rack().map(|r| r.is_master()), Some(false));
    assert_eq!((follower.run_start(), follower.run_end()), (1050.0, 2050.0));
}

#[test]
fn test_higher_frame_offset_moves_no_rack() {
    let (mut doc, sheet) = document();
    let first = doc.create_shape(sheet, rack(500.0, 0.0, 5000.0)).unwrap();
    let second = doc.create_shape(sheet, rack(1500.0, 0.0, 5000.0)).unwrap();
    assert_eq!(doc.shape(sheet, second).unwrap().run_start(), 1580.0);

    doc.set_rack_settings(RackSettings {
        frame_offset: 100.0,
        ..RackSettings::default()
    })
    .unwrap();

    assert_eq!(doc.rack_groups(sheet).unwrap().len(), 1);
    assert_eq!(doc.rack_groups(sheet).unwrap()[0].racks, vec![first, second]);
    let master = doc.shape(sheet, first).unwrap();
    assert_eq!((master.run_start(), master.run_end()), (480.0, 1500.0));
    let follower = doc.shape(sheet, second).unwrap();
    assert_eq!(follower.as_rack().map(|r| r.is_master()), Some(false));
    assert_eq!((follower.run_start(), follower.run_end()), (1600.0, 2500.0));
    assert_eq!(follower.top_left.y, 0.0);
}

#[test]
fn test_grown_master_slides_clear_of_block() {
    let (mut doc, sheet) = document();
    let first = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    let second = doc.create_shape(sheet, rack(1000.0, 0.0, 5000.0)).unwrap();
    // Fills the frame offset gap left ahead of the subordinate rack.
    let block = doc
        .create_shape(sheet, Shape::block(1000.0, 0.0, 80.0, 1000.0))
        .unwrap();
    let before = doc.snapshot();

    doc.delete_shapes(sheet, &[first]).unwrap();

    let grown = doc.shape(sheet, second).unwrap();
    assert_eq!(grown.as_rack().map(|r| r.is_master()), Some(true));
    assert_eq!(grown.length, 1000.0);
    assert_eq!(grown.top_left, Point::new(1080.0, 0.0));
    assert_eq!(doc.shape(sheet, block).unwrap().top_left, Point::new(1000.0, 0.0));

    assert!(doc.undo().unwrap());
    assert_eq!(doc.state(), &before);
    let restored = doc.shape(sheet, second).unwrap();
    assert_eq!(restored.top_left, Point::new(1080.0, 0.0));
    assert_eq!(restored.length, 920.0);
    assert!(doc.shape(sheet, first).is_ok());
}

#[test]
fn test_boxed_in_growth_is_rejected() {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Tight", 1500.0, 1000.0).unwrap();
    let first = doc
        .create_shape(sheet, Shape::rack(0.0, 0.0, 500.0, 1000.0, 5000.0, Rotation::Horizontal))
        .unwrap();
    let second = doc.create_shape(sheet, rack(500.0, 0.0, 5000.0)).unwrap();
    doc.create_shape(sheet, Shape::block(500.0, 0.0, 80.0, 1000.0))
        .unwrap();
    let before = doc.snapshot();

    // A shallower master no longer lines up, so the second rack becomes a
    // master and has nowhere to grow.
    let err = doc
        .modify_shape(sheet, first, |shape| shape.width = 900.0)
        .unwrap_err();
    assert!(matches!(err, LayoutError::Unrepairable { shape, .. } if shape == second));
    assert_eq!(doc.state(), &before);
}

#[test]
fn test_interactive_create_is_one_undo_step() {
    let (mut doc, sheet) = document();
    let depth = doc.undo_depth();

    let id = doc.begin_create(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    doc.update_pending(Point::new(200.0, 200.0), 1500.0, 1000.0).unwrap();
    doc.update_pending(Point::new(400.0, 400.0), 2500.0, 1000.0).unwrap();
    assert!(!doc.can_undo());
    assert_eq!(doc.commit_create().unwrap(), id);

    assert_eq!(doc.undo_depth(), depth + 1);
    let shape = doc.shape(sheet, id).unwrap();
    assert!(shape.initialized);
    assert_eq!(shape.length, 2500.0);
    assert_eq!(shape.top_left, Point::new(400.0, 400.0));
}

#[test]
fn test_cancelled_create_leaves_nothing() {
    let (mut doc, sheet) = document();
    let before = doc.snapshot();
    doc.begin_create(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    assert_eq!(doc.begin_command(), Err(LayoutError::CommandInProgress));
    doc.cancel_command().unwrap();
    assert_eq!(doc.state(), &before);
    assert_eq!(doc.cancel_command(), Err(LayoutError::NoCommand));
}

#[test]
fn test_bulk_edit_is_committed_by_mark_changed() {
    let (mut doc, sheet) = document();
    let depth = doc.undo_depth();
    doc.state_mut().sheet_mut(sheet).unwrap().name = "Renamed".to_string();
    doc.mark_changed().unwrap();

    assert_eq!(doc.undo_depth(), depth + 1);
    assert!(doc.undo().unwrap());
    assert_eq!(doc.sheet(sheet).unwrap().name, "Hall A");
}

#[test]
fn test_set_last_state_discards_uncommitted_edits() {
    let (mut doc, sheet) = document();
    doc.state_mut().sheet_mut(sheet).unwrap().name = "Renamed".to_string();
    doc.set_last_state();
    assert_eq!(doc.sheet(sheet).unwrap().name, "Hall A");
}

#[test]
fn test_history_depth_counts_undo_steps() {
    let mut config = EngineConfig::default();
    config.history.max_depth = 2;
    let mut doc = DrawingDocument::new(config);
    let sheet = doc.add_sheet("Hall A", 10000.0, 10000.0).unwrap();
    for y in [0.0, 2000.0, 4000.0] {
        doc.create_shape(sheet, rack(0.0, y, 5000.0)).unwrap();
    }

    assert_eq!(doc.undo_depth(), 2);
    assert!(doc.undo().unwrap());
    assert!(doc.undo().unwrap());
    assert!(!doc.undo().unwrap());
    assert_eq!(doc.sheet(sheet).unwrap().shapes.len(), 1);
}

#[test]
fn test_bulk_edit_overlap_is_repaired_on_commit() {
    let (mut doc, sheet) = document();
    doc.create_shape(sheet, Shape::block(0.0, 0.0, 1000.0, 1000.0)).unwrap();
    let added = doc
        .state_mut()
        .sheet_mut(sheet)
        .unwrap()
        .shapes
        .add(Shape::block(500.0, 0.0, 1000.0, 1000.0));
    doc.mark_changed().unwrap();

    let settings = LayoutSettings::default();
    let shapes = doc.sheet(sheet).unwrap().shapes.all();
    assert_eq!(shapes.len(), 2);
    assert!(!shapes_conflict(&shapes[0], &shapes[1], &settings));
    assert!(doc.shape(sheet, added).is_ok());
}

#[test]
fn test_bulk_edit_without_free_spot_is_reverted() {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Small", 1000.0, 1000.0).unwrap();
    doc.create_shape(sheet, Shape::block(0.0, 0.0, 1000.0, 1000.0)).unwrap();
    let before = doc.snapshot();
    let depth = doc.undo_depth();

    doc.state_mut()
        .sheet_mut(sheet)
        .unwrap()
        .shapes
        .add(Shape::block(100.0, 100.0, 200.0, 200.0));
    let err = doc.mark_changed().unwrap_err();
    assert!(matches!(err, LayoutError::Unrepairable { .. }));
    assert_eq!(doc.state(), &before);
    assert_eq!(doc.undo_depth(), depth);
}

#[test]
fn test_history_and_rejection_events_are_published() {
    let (mut doc, sheet) = document();
    let seen: Arc<Mutex<Vec<AppEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    doc.events().subscribe(
        EventFilter::Categories(vec![EventCategory::History, EventCategory::Diagnostics]),
        move |event| sink.lock().unwrap().push(event),
    );

    doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    doc.create_shape(sheet, rack(0.0, 0.0, 20000.0)).unwrap_err();

    let events = seen.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::History(HistoryEvent::Recorded { can_undo: true, .. })
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Diagnostics(DiagnosticEvent::OperationRejected { .. })
    )));
}

#[test]
fn test_tie_beam_errors_for_racks_near_clear_height() {
    let (mut doc, sheet) = document();
    let tall = Shape::rack(0.0, 0.0, 2800.0, 1000.0, 11950.0, Rotation::Horizontal);
    let tall = doc.create_shape(sheet, tall).unwrap();
    doc.create_shape(sheet, Shape::aisle(0.0, 1000.0, 2800.0, 3000.0)).unwrap();
    let far = Shape::rack(0.0, 4000.0, 2800.0, 1000.0, 8000.0, Rotation::Horizontal);
    doc.create_shape(sheet, far).unwrap();

    assert_eq!(doc.tie_beam_errors(sheet).unwrap(), &[tall]);
    assert!(doc.tie_beams(sheet).unwrap().is_empty());
    let flagged = doc.shape(sheet, tall).unwrap().as_rack().map(|r| r.tie_beam_error);
    assert_eq!(flagged, Some(true));
}

#[test]
fn test_events_reach_broadcast_receiver() {
    let (mut doc, sheet) = document();
    let mut receiver = doc.events().receiver();
    doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();

    let mut layout_seen = false;
    while let Ok(event) = receiver.try_recv() {
        if matches!(event, AppEvent::Layout(_)) {
            layout_seen = true;
        }
    }
    assert!(layout_seen);
}

#[test]
fn test_switching_sheets_clears_selection() {
    let (mut doc, sheet) = document();
    let id = doc.create_shape(sheet, rack(0.0, 0.0, 5000.0)).unwrap();
    doc.select(sheet, &[id]).unwrap();
    let other = doc.add_sheet("Hall B", 5000.0, 5000.0).unwrap();

    doc.set_current_sheet(other).unwrap();
    assert!(doc.selection().is_empty());
    assert_eq!(doc.set_current_sheet(7), Err(LayoutError::UnknownSheet(7)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn committed_layout_never_overlaps(
        placements in prop::collection::vec((0u32..90, 0u32..90, any::<bool>()), 1..10)
    ) {
        let (mut doc, sheet) = document();
        for (x, y, is_rack) in placements {
            let (x, y) = (f64::from(x) * 100.0, f64::from(y) * 100.0);
            let shape = if is_rack {
                rack(x, y, 5000.0)
            } else {
                Shape::block(x, y, 800.0, 800.0)
            };
            let _ = doc.create_shape(sheet, shape);
        }

        let settings = LayoutSettings::default();
        let layout = doc.sheet(sheet).unwrap();
        let shapes = layout.shapes.all();
        for (i, a) in shapes.iter().enumerate() {
            prop_assert!(within_sheet(a, &layout.bounds(), &settings));
            for b in &shapes[i + 1..] {
                prop_assert!(!shapes_conflict(a, b, &settings), "{} overlaps {}", a.id, b.id);
            }
        }
    }
}
