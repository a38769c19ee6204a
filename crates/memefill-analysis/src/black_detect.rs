//! Black segment detection by mean frame luminance.
//!
//! Walks a video once, front to back, and reports every maximal run of
//! frames whose mean luma falls below a threshold. No model and no
//! minimum run length: a single dark frame is a one-frame segment.

use memefill_core::{MemeFillError, Result, Segment, DEFAULT_BLACK_THRESHOLD};
use memefill_media::{ExportCancel, FrameSource, VideoDecoder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Frames between progress callbacks.
const PROGRESS_INTERVAL: u64 = 25;

/// Configuration for black segment detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackDetectConfig {
    /// Mean luma (0-255) strictly below which a frame is black (default: 10).
    pub threshold: f64,
}

impl Default for BlackDetectConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BLACK_THRESHOLD,
        }
    }
}

/// Streaming classifier that turns per-frame brightness into segments.
///
/// Feed brightness values in frame order with [`push`](Self::push); call
/// [`finish`](Self::finish) at end of stream to close a trailing run.
#[derive(Debug, Clone)]
pub struct BlackSegmentTracker {
    threshold: f64,
    open_start: Option<u64>,
    next_index: u64,
}

impl BlackSegmentTracker {
    /// Create a tracker using the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            open_start: None,
            next_index: 0,
        }
    }

    /// Number of frames seen so far.
    pub fn frames_seen(&self) -> u64 {
        self.next_index
    }

    /// Classify the next frame. Returns a segment when a black run ends on
    /// the previous frame.
    pub fn push(&mut self, brightness: f64) -> Option<Segment> {
        let index = self.next_index;
        self.next_index += 1;

        if brightness < self.threshold {
            if self.open_start.is_none() {
                self.open_start = Some(index);
            }
            None
        } else {
            self.open_start
                .take()
                .map(|start| Segment::new(start, index - 1))
        }
    }

    /// Close a run left open at end of stream on the last frame seen.
    pub fn finish(self) -> Option<Segment> {
        self.open_start
            .map(|start| Segment::new(start, self.next_index - 1))
    }
}

/// Collect segments from a sequence of per-frame brightness values.
pub fn segments_from_brightness<I>(brightness: I, threshold: f64) -> Vec<Segment>
where
    I: IntoIterator<Item = f64>,
{
    let mut tracker = BlackSegmentTracker::new(threshold);
    let mut segments: Vec<Segment> = brightness
        .into_iter()
        .filter_map(|b| tracker.push(b))
        .collect();
    segments.extend(tracker.finish());
    segments
}

/// Detect black segments in a frame source.
pub fn detect_black_segments<S>(source: &mut S, config: &BlackDetectConfig) -> Result<Vec<Segment>>
where
    S: FrameSource + ?Sized,
{
    detect_black_segments_with(source, config, &ExportCancel::new(), |_, _| {})
}

/// Detect black segments, reporting progress and honoring cancellation.
///
/// `on_progress` receives `(frames_scanned, total_frames_hint)` every few
/// frames and once at the end.
pub fn detect_black_segments_with<S, F>(
    source: &mut S,
    config: &BlackDetectConfig,
    cancel: &ExportCancel,
    mut on_progress: F,
) -> Result<Vec<Segment>>
where
    S: FrameSource + ?Sized,
    F: FnMut(u64, Option<u64>),
{
    let total = source.frame_count_hint();
    let mut tracker = BlackSegmentTracker::new(config.threshold);
    let mut segments = Vec::new();

    while let Some(frame) = source.next_frame()? {
        if cancel.is_cancelled() {
            return Err(MemeFillError::Cancelled);
        }

        let brightness = frame.mean_luma();
        if let Some(segment) = tracker.push(brightness) {
            debug!(start = segment.start, end = segment.end, "Black segment detected");
            segments.push(segment);
        }

        let seen = tracker.frames_seen();
        if seen % PROGRESS_INTERVAL == 0 {
            on_progress(seen, total);
        }
    }

    let scanned = tracker.frames_seen();
    if let Some(segment) = tracker.finish() {
        debug!(
            start = segment.start,
            end = segment.end,
            "Black segment open at end of stream"
        );
        segments.push(segment);
    }
    on_progress(scanned, total);

    info!(
        frames = scanned,
        segments = segments.len(),
        threshold = config.threshold,
        "Black frame detection finished"
    );
    Ok(segments)
}

/// Open a video file and detect its black segments.
///
/// An unopenable file is an error ([`MemeFillError::SourceUnavailable`]),
/// the same policy composition uses.
pub fn detect_black_segments_in_file<P: AsRef<Path>>(
    path: P,
    config: &BlackDetectConfig,
) -> Result<Vec<Segment>> {
    let mut decoder = VideoDecoder::open(path)?;
    detect_black_segments(&mut decoder, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memefill_core::FrameRate;
    use memefill_media::MemorySource;
    use proptest::prelude::*;

    fn source(levels: &[u8]) -> MemorySource {
        MemorySource::from_gray_levels(FrameRate::FPS_10, 8, 8, levels)
    }

    #[test]
    fn test_single_run_in_middle() {
        let mut levels = vec![120u8; 100];
        levels[20..30].fill(0);
        let segments =
            detect_black_segments(&mut source(&levels), &BlackDetectConfig::default()).unwrap();
        assert_eq!(segments, vec![Segment::new(20, 29)]);
    }

    #[test]
    fn test_run_open_at_end_is_closed_on_last_frame() {
        let levels = [200, 200, 3, 3, 3];
        let segments =
            detect_black_segments(&mut source(&levels), &BlackDetectConfig::default()).unwrap();
        assert_eq!(segments, vec![Segment::new(2, 4)]);
    }

    #[test]
    fn test_single_dark_frame_is_a_segment() {
        let levels = [50, 0, 50];
        let segments =
            detect_black_segments(&mut source(&levels), &BlackDetectConfig::default()).unwrap();
        assert_eq!(segments, vec![Segment::new(1, 1)]);
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly at threshold is not black
        let segments = segments_from_brightness([10.0, 9.999, 10.0], 10.0);
        assert_eq!(segments, vec![Segment::new(1, 1)]);
    }

    #[test]
    fn test_all_black_and_empty_inputs() {
        assert_eq!(
            segments_from_brightness([0.0; 4], 10.0),
            vec![Segment::new(0, 3)]
        );
        assert!(segments_from_brightness(std::iter::empty(), 10.0).is_empty());
    }

    #[test]
    fn test_progress_reports_final_count() {
        let levels = vec![0u8; 60];
        let mut reports = Vec::new();
        detect_black_segments_with(
            &mut source(&levels),
            &BlackDetectConfig::default(),
            &ExportCancel::new(),
            |seen, total| reports.push((seen, total)),
        )
        .unwrap();
        assert_eq!(reports, vec![(25, Some(60)), (50, Some(60)), (60, Some(60))]);
    }

    #[test]
    fn test_cancelled_detection() {
        let cancel = ExportCancel::new();
        cancel.cancel();
        let result = detect_black_segments_with(
            &mut source(&[0, 0, 0]),
            &BlackDetectConfig::default(),
            &cancel,
            |_, _| {},
        );
        assert!(matches!(result, Err(MemeFillError::Cancelled)));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let result =
            detect_black_segments_in_file("/no/such/input.mp4", &BlackDetectConfig::default());
        assert!(matches!(result, Err(MemeFillError::SourceUnavailable(_))));
    }

    proptest! {
        #[test]
        fn dark_run_yields_exact_segment(len in 1usize..200, start in 0usize..200, k in 1usize..50) {
            let total = start + k + len;
            let mut levels = vec![40.0f64; total];
            for b in &mut levels[start..start + k] {
                *b = 0.0;
            }
            let segments = segments_from_brightness(levels, 10.0);
            prop_assert_eq!(segments, vec![Segment::new(start as u64, (start + k - 1) as u64)]);
        }

        #[test]
        fn segments_are_ordered_disjoint_and_dark(levels in prop::collection::vec(0u8..30, 0..300)) {
            let brightness: Vec<f64> = levels.iter().map(|&v| v as f64).collect();
            let segments = segments_from_brightness(brightness.iter().copied(), 10.0);
            for pair in segments.windows(2) {
                // Runs are maximal, so there is at least one bright frame between them
                prop_assert!(pair[0].end + 1 < pair[1].start);
            }
            for seg in &segments {
                for i in seg.start..=seg.end {
                    prop_assert!(brightness[i as usize] < 10.0);
                }
            }
            let dark = brightness.iter().filter(|&&b| b < 10.0).count() as u64;
            prop_assert_eq!(segments.iter().map(|s| s.len()).sum::<u64>(), dark);
        }
    }
}
