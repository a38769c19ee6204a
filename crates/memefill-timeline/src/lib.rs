//! MemeFill Timeline - segment editing model
//!
//! Implements the editable list of fill segments:
//! - Snapshot-based undo/redo history
//! - Tool-driven mutations (marker, split, selection)
//! - Pixel/frame mapping for drawing and hit-testing a timeline strip
//! - Versioned JSON persistence of segment lists

pub mod edit;
pub mod history;
pub mod serialization;
pub mod view;

pub use edit::{EditOutcome, EditTool, TimelineModel};
pub use history::UndoStack;
pub use serialization::SegmentFile;
pub use view::TimelineScale;
