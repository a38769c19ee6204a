//! Integration tests for the segment timeline.
//!
//! Exercises cross-crate interactions between memefill-analysis,
//! memefill-timeline and memefill-core.

use memefill_analysis::segments_from_brightness;
use memefill_core::{normalize_segments, Segment};
use memefill_timeline::{EditOutcome, EditTool, SegmentFile, TimelineModel, TimelineScale};

fn detected() -> Vec<Segment> {
    let mut brightness = vec![80.0; 120];
    for b in &mut brightness[10..20] {
        *b = 2.0;
    }
    for b in &mut brightness[60..90] {
        *b = 0.0;
    }
    segments_from_brightness(brightness, 10.0)
}

#[test]
fn detection_results_load_into_timeline() {
    let mut model = TimelineModel::new();
    model.set_segments(detected());
    assert_eq!(model.segments(), &[Segment::new(10, 19), Segment::new(60, 89)]);
    assert_eq!(model.undo_count(), 1);
}

#[test]
fn editing_session_with_full_history_replay() {
    let mut model = TimelineModel::new();
    model.set_segments(detected());

    model.set_tool(EditTool::Split);
    assert!(matches!(model.apply_tool(75), EditOutcome::Split { .. }));
    model.set_tool(EditTool::Marker);
    model.apply_tool(100);
    model.set_tool(EditTool::Split);
    assert_eq!(model.apply_tool(5), EditOutcome::NothingToSplit);

    let final_state = model.segments().to_vec();
    assert_eq!(
        final_state,
        vec![
            Segment::new(10, 19),
            Segment::new(60, 75),
            Segment::new(75, 89),
            Segment::new(100, 105),
        ]
    );
    assert_eq!(model.undo_count(), 4);

    while model.undo().is_some() {}
    assert!(model.segments().is_empty());
    assert_eq!(model.redo_count(), 4);

    while model.redo().is_some() {}
    assert_eq!(model.segments(), &final_state[..]);
}

#[test]
fn markers_then_normalize_merges_overlaps() {
    let mut model = TimelineModel::new();
    model.add_marker(50);
    model.add_marker(10);
    model.add_marker(53);
    model.normalize();
    assert_eq!(model.segments(), &[Segment::new(10, 15), Segment::new(50, 58)]);
    assert_eq!(
        model.segments(),
        &normalize_segments(&[Segment::new(50, 55), Segment::new(10, 15), Segment::new(53, 58)])[..]
    );
}

#[test]
fn pixel_clicks_map_to_frames() {
    let scale = TimelineScale::new(120, 600.0);
    let mut model = TimelineModel::new();
    model.set_segments(detected());

    model.set_tool(EditTool::Split);
    let frame = scale.frame_at(350.0);
    assert_eq!(frame, 70);
    model.apply_tool(frame);

    let (left, right) = scale.span(model.segments()[1]);
    assert!((left - 300.0).abs() < 1e-3);
    assert!((right - 350.0).abs() < 1e-3);
}

#[test]
fn edited_segments_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edit.json");

    let mut model = TimelineModel::new();
    model.set_segments(detected());
    model.add_marker(3);
    SegmentFile::new(model.segments().to_vec())
        .with_source("input.mp4")
        .save_to_file(&path)
        .unwrap();

    let loaded = SegmentFile::load_from_file(&path).unwrap();
    assert_eq!(loaded.source.as_deref(), Some("input.mp4"));

    let mut restored = TimelineModel::new();
    restored.set_segments(loaded.segments);
    assert_eq!(restored.segments(), model.segments());
}
