//! Segment edit operations with undo/redo support.
//!
//! `TimelineModel` owns the current segment list. Every mutating call
//! snapshots the list onto the undo stack first, even when the mutation turns
//! out to change nothing (a split that hits no segment still costs one undo
//! step).

use memefill_core::{normalize_segments, MemeFillError, Segment, MARKER_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::history::UndoStack;

// ── Tools ───────────────────────────────────────────────────────

/// Editing tool applied when the user clicks a frame on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EditTool {
    /// Drop a short marker segment at the clicked frame.
    #[default]
    Marker,
    /// Cut the segment under the clicked frame in two.
    Split,
    /// Currently behaves exactly like `Marker`.
    Selection,
}

impl EditTool {
    /// All tools in picker order.
    pub const ALL: [EditTool; 3] = [Self::Marker, Self::Split, Self::Selection];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Marker => "Marker Tool",
            Self::Split => "Split Tool",
            Self::Selection => "Selection Tool",
        }
    }
}

impl fmt::Display for EditTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts `marker`, `Split`, `Selection Tool` and similar.
impl FromStr for EditTool {
    type Err = MemeFillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_suffix(" tool").unwrap_or(&lower).trim();
        match name {
            "marker" => Ok(Self::Marker),
            "split" => Ok(Self::Split),
            "selection" | "select" => Ok(Self::Selection),
            _ => Err(MemeFillError::InvalidParameter(format!("Unknown tool: {s}"))),
        }
    }
}

/// What a tool click did to the segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A marker segment was appended.
    MarkerAdded(Segment),
    /// `original` was replaced by `left` and `right`.
    Split {
        original: Segment,
        left: Segment,
        right: Segment,
    },
    /// No segment had the frame strictly inside it. An undo step was still recorded.
    NothingToSplit,
}

// ── Model ───────────────────────────────────────────────────────

/// The editable segment list of one session.
#[derive(Debug, Clone, Default)]
pub struct TimelineModel {
    segments: Vec<Segment>,
    history: UndoStack<Vec<Segment>>,
    active_tool: EditTool,
}

impl TimelineModel {
    /// Create an empty timeline with unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty timeline keeping at most `limit` undo steps.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: UndoStack::new(limit),
            ..Self::default()
        }
    }

    /// Current segments, in list order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn record(&mut self) {
        self.history.push(self.segments.clone());
    }

    /// Replace the whole list (e.g. with fresh detection results).
    pub fn set_segments(&mut self, segments: impl Into<Vec<Segment>>) {
        self.record();
        self.segments = segments.into();
        debug!(segments = self.segments.len(), "Timeline segments replaced");
    }

    /// Append a marker covering `[frame, frame + MARKER_LENGTH]`.
    pub fn add_marker(&mut self, frame: u64) -> Segment {
        self.record();
        let marker = Segment::new(frame, frame.saturating_add(MARKER_LENGTH));
        self.segments.push(marker);
        debug!(start = marker.start, end = marker.end, "Marker added");
        marker
    }

    /// Split the first segment with `start < frame < end` into
    /// `(start, frame)` and `(frame, end)`, in place.
    ///
    /// Only the first match is split. The undo snapshot is recorded whether or
    /// not a segment was found.
    pub fn split_segment(&mut self, frame: u64) -> EditOutcome {
        self.record();
        let Some(index) = self
            .segments
            .iter()
            .position(|s| s.contains_interior(frame))
        else {
            debug!(frame, "Split missed every segment");
            return EditOutcome::NothingToSplit;
        };

        let original = self.segments[index];
        let left = Segment::new(original.start, frame);
        let right = Segment::new(frame, original.end);
        self.segments.splice(index..=index, [left, right]);
        debug!(frame, %original, "Segment split");
        EditOutcome::Split {
            original,
            left,
            right,
        }
    }

    /// Sort segments by start and merge overlaps. Recorded in history.
    pub fn normalize(&mut self) {
        self.record();
        self.segments = normalize_segments(&self.segments);
    }

    /// Apply the active tool at `frame`.
    pub fn apply_tool(&mut self, frame: u64) -> EditOutcome {
        match self.active_tool {
            EditTool::Marker | EditTool::Selection => {
                EditOutcome::MarkerAdded(self.add_marker(frame))
            }
            EditTool::Split => self.split_segment(frame),
        }
    }

    /// Revert the last mutation. Returns `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Option<&[Segment]> {
        let current = std::mem::take(&mut self.segments);
        match self.history.undo(current) {
            Ok(previous) => {
                self.segments = previous;
                Some(&self.segments)
            }
            Err(current) => {
                self.segments = current;
                None
            }
        }
    }

    /// Re-apply the last undone mutation. Returns `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Option<&[Segment]> {
        let current = std::mem::take(&mut self.segments);
        match self.history.redo(current) {
            Ok(next) => {
                self.segments = next;
                Some(&self.segments)
            }
            Err(current) => {
                self.segments = current;
                None
            }
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    /// Number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    /// Store the active tool.
    pub fn set_tool(&mut self, tool: EditTool) {
        self.active_tool = tool;
    }

    /// The tool applied by [`apply_tool`](Self::apply_tool).
    pub fn active_tool(&self) -> EditTool {
        self.active_tool
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seg(start: u64, end: u64) -> Segment {
        Segment::new(start, end)
    }

    #[test]
    fn test_set_segments_records_history() {
        let mut model = TimelineModel::new();
        model.set_segments(vec![seg(20, 29)]);
        assert_eq!(model.segments(), &[seg(20, 29)]);
        assert_eq!(model.undo_count(), 1);
        assert!(!model.can_redo());

        assert_eq!(model.undo().unwrap(), &[] as &[Segment]);
        assert_eq!(model.redo().unwrap(), &[seg(20, 29)]);
    }

    #[test]
    fn test_add_marker_fixed_width() {
        let mut model = TimelineModel::new();
        let marker = model.add_marker(100);
        assert_eq!(marker, seg(100, 105));
        assert_eq!(model.segments(), &[seg(100, 105)]);
    }

    #[test]
    fn test_marker_near_u64_max_saturates() {
        let mut model = TimelineModel::new();
        assert_eq!(model.add_marker(u64::MAX - 1), seg(u64::MAX - 1, u64::MAX));
    }

    #[test]
    fn test_split_interior_frame_in_place() {
        let mut model = TimelineModel::new();
        model.set_segments(vec![seg(0, 5), seg(10, 20), seg(30, 40)]);
        let outcome = model.split_segment(15);
        assert_eq!(
            outcome,
            EditOutcome::Split {
                original: seg(10, 20),
                left: seg(10, 15),
                right: seg(15, 20),
            }
        );
        assert_eq!(
            model.segments(),
            &[seg(0, 5), seg(10, 15), seg(15, 20), seg(30, 40)]
        );
    }

    #[test]
    fn test_split_only_first_overlapping_segment() {
        let mut model = TimelineModel::new();
        model.set_segments(vec![seg(0, 20), seg(5, 25)]);
        model.split_segment(10);
        assert_eq!(model.segments(), &[seg(0, 10), seg(10, 20), seg(5, 25)]);
    }

    #[test]
    fn test_split_on_boundary_is_noop_but_recorded() {
        let mut model = TimelineModel::new();
        model.set_segments(vec![seg(10, 20)]);
        let before = model.undo_count();

        assert_eq!(model.split_segment(10), EditOutcome::NothingToSplit);
        assert_eq!(model.split_segment(20), EditOutcome::NothingToSplit);
        assert_eq!(model.split_segment(99), EditOutcome::NothingToSplit);

        assert_eq!(model.segments(), &[seg(10, 20)]);
        assert_eq!(model.undo_count(), before + 3);
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut model = TimelineModel::new();
        assert!(model.undo().is_none());
        assert!(model.redo().is_none());
        assert!(model.segments().is_empty());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut model = TimelineModel::new();
        model.add_marker(1);
        model.undo();
        assert!(model.can_redo());
        model.add_marker(2);
        assert!(!model.can_redo());
        assert_eq!(model.segments(), &[seg(2, 7)]);
    }

    #[test]
    fn test_apply_tool_dispatch() {
        let mut model = TimelineModel::new();
        assert_eq!(model.active_tool(), EditTool::Marker);
        assert_eq!(model.apply_tool(10), EditOutcome::MarkerAdded(seg(10, 15)));

        model.set_tool(EditTool::Selection);
        assert_eq!(model.apply_tool(50), EditOutcome::MarkerAdded(seg(50, 55)));

        model.set_tool(EditTool::Split);
        assert!(matches!(model.apply_tool(12), EditOutcome::Split { .. }));
        assert_eq!(model.segments(), &[seg(10, 12), seg(12, 15), seg(50, 55)]);
    }

    #[test]
    fn test_normalize_is_undoable() {
        let mut model = TimelineModel::new();
        model.set_segments(vec![seg(30, 40), seg(0, 5), seg(35, 45)]);
        model.normalize();
        assert_eq!(model.segments(), &[seg(0, 5), seg(30, 45)]);
        model.undo();
        assert_eq!(model.segments(), &[seg(30, 40), seg(0, 5), seg(35, 45)]);
    }

    #[test]
    fn test_history_limit() {
        let mut model = TimelineModel::with_history_limit(2);
        for f in 0..5 {
            model.add_marker(f);
        }
        assert_eq!(model.undo_count(), 2);
    }

    #[test]
    fn test_tool_parsing() {
        assert_eq!("marker".parse::<EditTool>().unwrap(), EditTool::Marker);
        assert_eq!("Split Tool".parse::<EditTool>().unwrap(), EditTool::Split);
        assert_eq!(" SELECTION ".parse::<EditTool>().unwrap(), EditTool::Selection);
        assert!("lasso".parse::<EditTool>().is_err());
        for tool in EditTool::ALL {
            assert_eq!(tool.label().parse::<EditTool>().unwrap(), tool);
        }
    }

    // ── Property tests ────────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        Set(Vec<(u64, u64)>),
        Marker(u64),
        Split(u64),
        Normalize,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop::collection::vec((0u64..200, 0u64..30), 0..6).prop_map(Op::Set),
            (0u64..250).prop_map(Op::Marker),
            (0u64..250).prop_map(Op::Split),
            Just(Op::Normalize),
        ]
    }

    fn apply(model: &mut TimelineModel, op: &Op) {
        match op {
            Op::Set(raw) => model.set_segments(
                raw.iter()
                    .map(|&(s, l)| Segment::new(s, s + l))
                    .collect::<Vec<_>>(),
            ),
            Op::Marker(f) => {
                model.add_marker(*f);
            }
            Op::Split(f) => {
                model.split_segment(*f);
            }
            Op::Normalize => model.normalize(),
        }
    }

    proptest! {
        #[test]
        fn every_mutation_adds_one_undo_and_clears_redo(ops in prop::collection::vec(op_strategy(), 1..30)) {
            let mut model = TimelineModel::new();
            for (i, op) in ops.iter().enumerate() {
                apply(&mut model, op);
                prop_assert_eq!(model.undo_count(), i + 1);
                prop_assert_eq!(model.redo_count(), 0);
            }
        }

        #[test]
        fn undo_then_redo_restores_state(
            ops in prop::collection::vec(op_strategy(), 1..20),
            undos in 0usize..25,
        ) {
            let mut model = TimelineModel::new();
            for op in &ops {
                apply(&mut model, op);
            }
            for _ in 0..undos {
                let before = model.segments().to_vec();
                if model.undo().is_none() {
                    prop_assert_eq!(model.segments(), &before[..]);
                    break;
                }
                let after_undo = model.segments().to_vec();
                prop_assert_eq!(model.redo().unwrap(), &before[..]);
                prop_assert_eq!(model.undo().unwrap(), &after_undo[..]);
            }
        }

        #[test]
        fn missed_split_keeps_content(raw in prop::collection::vec((0u64..100, 0u64..10), 0..8), frame in 0u64..200) {
            let mut model = TimelineModel::new();
            model.set_segments(raw.iter().map(|&(s, l)| Segment::new(s, s + l)).collect::<Vec<_>>());
            let before = model.segments().to_vec();
            let undo_before = model.undo_count();
            if model.split_segment(frame) == EditOutcome::NothingToSplit {
                prop_assert_eq!(model.segments(), &before[..]);
            } else {
                prop_assert_eq!(model.segments().len(), before.len() + 1);
            }
            prop_assert_eq!(model.undo_count(), undo_before + 1);
        }
    }
}
