//! End-to-end operator scenarios for the region editor.
//!
//! Drives the public API the way a configuration screen would: start a
//! drawing from form input, click or add points, finish, and export.

use assert_matches::assert_matches;
use vigil_core::editor::{DrawRequest, EditorConfig, EditorState, RegionEditor};
use vigil_core::geometry::{BoundingBox, Point};
use vigil_core::region::{CountSubject, Direction, RegionKind, RegionKindKey};
use vigil_core::render::{backend_for, render, DrawCommand};
use vigil_core::CoreError;

// ---------------------------------------------------------------------------
// Test: boundary-crossing polyline
// ---------------------------------------------------------------------------

/// Three points and a finish produce one boundary-crossing region with the
/// points in click order, and the editor returns to idle.
#[test]
fn north_gate_boundary_polyline() {
    let mut editor = RegionEditor::new(EditorConfig::overlay());
    editor
        .start_drawing(DrawRequest::new(
            "North Gate",
            RegionKindKey::BoundaryCrossing,
            "#ff0000",
        ))
        .expect("start should succeed");
    editor.add_point(Point::new(10.0, 20.0)).unwrap();
    editor.add_point(Point::new(50.0, 20.0)).unwrap();
    editor.add_point(Point::new(50.0, 80.0)).unwrap();
    editor.finish().expect("finish should succeed");

    assert_eq!(editor.state(), &EditorState::Idle);
    let [region] = editor.regions() else {
        panic!("expected exactly one region");
    };
    assert_eq!(region.name, "North Gate");
    assert_eq!(region.kind, RegionKind::BoundaryCrossing);
    assert_eq!(
        region.points,
        vec![
            Point::new(10.0, 20.0),
            Point::new(50.0, 20.0),
            Point::new(50.0, 80.0),
        ]
    );
    assert_eq!(region.color.hex(), "#ff0000");
    assert!(region.visible);
}

// ---------------------------------------------------------------------------
// Test: flow-counting segment
// ---------------------------------------------------------------------------

/// A flow-counting line carries its direction and count subject.
#[test]
fn lobby_count_flow_line() {
    let mut editor = RegionEditor::new(EditorConfig::counting_line());
    editor
        .start_drawing(
            DrawRequest::new("Lobby Count", RegionKindKey::FlowCounting, "#00ff00")
                .with_direction(Direction::LeftToRight)
                .with_count_subject(CountSubject::People),
        )
        .unwrap();
    editor.add_point(Point::new(20.0, 60.0)).unwrap();
    editor.add_point(Point::new(80.0, 60.0)).unwrap();
    let region = editor.finish().unwrap();

    assert_eq!(region.kind.direction(), Some(Direction::LeftToRight));
    assert_eq!(region.kind.count_subject(), Some(CountSubject::People));
}

/// Omitting the count subject for a flow-counting line is rejected up front.
#[test]
fn flow_line_without_subject_rejected() {
    let mut editor = RegionEditor::new(EditorConfig::counting_line());
    let result = editor.start_drawing(
        DrawRequest::new("Lobby Count", RegionKindKey::FlowCounting, "#00ff00")
            .with_direction(Direction::LeftToRight),
    );
    assert_matches!(result, Err(CoreError::Validation(_)));
    assert_eq!(editor.state(), &EditorState::Idle);
}

// ---------------------------------------------------------------------------
// Test: click mapping and rendering
// ---------------------------------------------------------------------------

/// Clicks recorded against a displayed frame land in percentage space, and
/// the overlay renders the finished region with an arrowhead.
#[test]
fn clicked_loitering_zone_renders_with_arrow() {
    let config = EditorConfig::overlay();
    let mut editor = RegionEditor::new(config);
    let bbox = BoundingBox::new(40.0, 120.0, 800.0, 450.0);
    editor
        .start_drawing(
            DrawRequest::new("Bench", RegionKindKey::LoiteringZone, "purple")
                .with_direction(Direction::TopToBottom),
        )
        .unwrap();
    editor.click(Point::new(440.0, 345.0), &bbox).unwrap();
    editor.click(Point::new(840.0, 570.0), &bbox).unwrap();
    let region = editor.finish().unwrap();
    assert_eq!(region.points, vec![Point::new(50.0, 50.0), Point::new(100.0, 100.0)]);

    let mut backend = backend_for(&config);
    render(&editor, backend.as_mut());
    let segments = backend
        .display_list()
        .into_iter()
        .filter(|c| matches!(c, DrawCommand::Segment { .. }))
        .count();
    assert_eq!(segments, 2);
}

/// A click outside the frame is rejected and does not disturb the buffer.
#[test]
fn click_outside_frame_rejected() {
    let mut editor = RegionEditor::default();
    editor
        .start_drawing(DrawRequest::new("Fence", RegionKindKey::BoundaryCrossing, "red"))
        .unwrap();
    let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    editor.click(Point::new(50.0, 50.0), &bbox).unwrap();
    assert!(editor.click(Point::new(150.0, 50.0), &bbox).is_err());
    assert_eq!(editor.draft_points().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: session lifecycle
// ---------------------------------------------------------------------------

/// Drawing, cancelling, redrawing and deleting leave exactly the expected
/// regions and emit matching events.
#[test]
fn full_session_lifecycle() {
    let mut editor = RegionEditor::default();

    editor
        .start_drawing(DrawRequest::new("Discarded", RegionKindKey::BoundaryCrossing, "red"))
        .unwrap();
    editor.add_point(Point::new(1.0, 1.0)).unwrap();
    editor.add_point(Point::new(2.0, 2.0)).unwrap();
    editor.cancel();

    editor
        .start_drawing(DrawRequest::new("Kept", RegionKindKey::BoundaryCrossing, "blue"))
        .unwrap();
    editor.add_point(Point::new(5.0, 5.0)).unwrap();
    assert!(editor.finish().is_err());
    editor.add_point(Point::new(6.0, 6.0)).unwrap();
    let kept = editor.finish().unwrap().id;

    editor
        .start_drawing(DrawRequest::new("Removed", RegionKindKey::BoundaryCrossing, "green"))
        .unwrap();
    editor.add_point(Point::new(7.0, 7.0)).unwrap();
    editor.add_point(Point::new(8.0, 8.0)).unwrap();
    let removed = editor.finish().unwrap().id;
    editor.delete_region(removed);

    let names: Vec<&str> = editor.regions().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Kept"]);
    assert_eq!(editor.regions()[0].id, kept);

    let events = serde_json::to_value(editor.take_events()).unwrap();
    let kinds: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "drawing_cancelled",
            "region_created",
            "region_created",
            "region_deleted",
        ]
    );
}
