//! MemeFill Core - Foundation types shared by every MemeFill crate
//!
//! This crate provides:
//! - Time representation (RationalTime, FrameRate)
//! - RGBA8 frame buffers and luminance measurement
//! - Frame-index segments and their normalization
//! - The common error type

pub mod error;
pub mod frame;
pub mod segment;
pub mod time;

pub use error::{MemeFillError, Result};
pub use frame::FrameBuffer;
pub use segment::{normalize_segments, sort_segments, Segment};
pub use time::{FrameRate, RationalTime};

/// Luminance threshold (0-255 scale) below which a frame counts as black.
pub const DEFAULT_BLACK_THRESHOLD: f64 = 10.0;

/// Length in frames added past the clicked frame by a marker.
pub const MARKER_LENGTH: u64 = 5;
