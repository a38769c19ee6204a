//! MemeFill Analysis - finding the frames to fill
//!
//! Currently provides black segment detection by mean luminance.

pub mod black_detect;

pub use black_detect::{
    detect_black_segments, detect_black_segments_in_file, detect_black_segments_with,
    segments_from_brightness, BlackDetectConfig, BlackSegmentTracker,
};
