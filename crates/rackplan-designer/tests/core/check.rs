use std::sync::{Arc, Mutex};

use rackplan_designer::{
    CheckOutcome, Confirmation, DrawingDocument, FixedAnswer, Point, Shape, ShapeId,
};

/// Loads shapes without any placement checks, the way opening a file does.
fn import(doc: &mut DrawingDocument, sheet: usize, shapes: Vec<Shape>) -> Vec<ShapeId> {
    let mut state = doc.snapshot();
    let target = state.sheet_mut(sheet).unwrap();
    let ids = shapes.into_iter().map(|s| target.shapes.add(s)).collect();
    doc.restore(state).unwrap();
    ids
}

/// A sheet with one block covering it and a small block on top.
fn crowded() -> (DrawingDocument, usize, ShapeId) {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Small", 1000.0, 1000.0).unwrap();
    let ids = import(
        &mut doc,
        sheet,
        vec![
            Shape::block(0.0, 0.0, 1000.0, 1000.0),
            Shape::block(100.0, 100.0, 200.0, 200.0),
        ],
    );
    (doc, sheet, ids[0])
}

#[test]
fn test_clean_document_is_ok() {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Hall", 10000.0, 10000.0).unwrap();
    doc.create_shape(sheet, Shape::block(0.0, 0.0, 1000.0, 1000.0)).unwrap();
    let depth = doc.undo_depth();

    assert_eq!(doc.check_document(false).unwrap(), CheckOutcome::Ok);
    assert_eq!(doc.undo_depth(), depth);
}

#[test]
fn test_overlap_is_moved_to_nearest_free_spot() {
    let mut doc = DrawingDocument::default();
    let sheet = doc.add_sheet("Hall", 10000.0, 10000.0).unwrap();
    let ids = import(
        &mut doc,
        sheet,
        vec![
            Shape::block(0.0, 0.0, 1000.0, 1000.0),
            Shape::block(500.0, 0.0, 1000.0, 1000.0),
        ],
    );

    let outcome = doc.check_document(false).unwrap();
    assert_eq!(outcome, CheckOutcome::Repaired { moved: 1, removed: 0 });
    assert_eq!(doc.shape(sheet, ids[0]).unwrap().top_left, Point::new(0.0, 1000.0));
    assert_eq!(doc.shape(sheet, ids[1]).unwrap().top_left, Point::new(500.0, 0.0));

    assert!(doc.undo().unwrap());
    assert_eq!(doc.shape(sheet, ids[0]).unwrap().top_left, Point::new(0.0, 0.0));
}

#[test]
fn test_unrepairable_without_prompts_changes_nothing() {
    let (mut doc, sheet, blocker) = crowded();
    let before = doc.snapshot();

    let outcome = doc.check_document(false).unwrap();
    assert_eq!(
        outcome,
        CheckOutcome::NeedsUserDecision {
            unrepairable: vec![(sheet, blocker)]
        }
    );
    assert_eq!(doc.state(), &before);
}

#[test]
fn test_confirmed_removal_deletes_unrepairable_shapes() {
    let (mut doc, sheet, blocker) = crowded();
    doc.set_confirmation_service(Box::new(FixedAnswer(Confirmation::Yes)));

    let outcome = doc.check_document(true).unwrap();
    assert_eq!(outcome, CheckOutcome::Repaired { moved: 0, removed: 1 });
    assert!(doc.shape(sheet, blocker).is_err());
    assert_eq!(doc.sheet(sheet).unwrap().shapes.len(), 1);
}

#[test]
fn test_declined_removal_keeps_document() {
    let (mut doc, sheet, blocker) = crowded();
    let prompts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&prompts);
    doc.set_confirmation_service(Box::new(move |message: &str| {
        seen.lock().unwrap().push(message.to_string());
        Confirmation::No
    }));
    let before = doc.snapshot();

    let outcome = doc.check_document(true).unwrap();
    assert!(matches!(outcome, CheckOutcome::NeedsUserDecision { .. }));
    assert_eq!(doc.state(), &before);
    assert!(doc.shape(sheet, blocker).is_ok());

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("1 shape(s)"));
}
