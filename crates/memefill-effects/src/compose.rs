//! Segment filling: overlay assets onto the frames of each segment.
//!
//! Frames are streamed once from a [`FrameSource`] to a [`FrameSink`]. The
//! segments are ordered by start frame and consumed with a single cursor; the
//! asset for the `i`-th segment in that order is `assets[i % assets.len()]`,
//! loaded and zoomed once when the segment's first frame is reached.
//!
//! Where segments overlap, the earlier one keeps the shared frames. A later
//! segment only takes over from the first frame after every earlier segment
//! has ended.

use memefill_core::{sort_segments, FrameBuffer, MemeFillError, RationalTime, Result, Segment};
use memefill_media::{
    ExportCancel, ExportJob, FrameSink, FrameSource, VideoCodec, VideoDecoder,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::blend::blend_into;
use crate::fade::FadeSchedule;
use crate::overlay::prepare_overlay;
use crate::{DEFAULT_FADE_MS, DEFAULT_ZOOM_FACTOR, MAX_ZOOM_FACTOR};

/// Frames between progress callbacks.
const PROGRESS_INTERVAL: u64 = 25;

/// Everything composition needs besides the video itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRequest {
    /// Segments to fill, in any order.
    pub segments: Vec<Segment>,
    /// Overlay assets, cycled per segment. Must not be empty.
    pub assets: Vec<PathBuf>,
    /// Overlay zoom multiplier, between 1 and [`MAX_ZOOM_FACTOR`].
    pub zoom_factor: f64,
    /// Fade-out length at the tail of each segment.
    pub fade: RationalTime,
}

impl CompositionRequest {
    pub fn new(segments: impl Into<Vec<Segment>>, assets: impl Into<Vec<PathBuf>>) -> Self {
        Self {
            segments: segments.into(),
            assets: assets.into(),
            zoom_factor: DEFAULT_ZOOM_FACTOR,
            fade: RationalTime::from_millis(DEFAULT_FADE_MS as i64),
        }
    }

    pub fn with_zoom(mut self, zoom_factor: f64) -> Self {
        self.zoom_factor = zoom_factor;
        self
    }

    pub fn with_fade_millis(mut self, millis: u64) -> Self {
        let millis = u32::try_from(millis).unwrap_or(u32::MAX);
        self.fade = RationalTime::from_millis(i64::from(millis));
        self
    }

    /// Reject requests that cannot produce a meaningful fill.
    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(MemeFillError::InvalidParameter(
                "At least one overlay asset is required".into(),
            ));
        }
        if !(1.0..=MAX_ZOOM_FACTOR).contains(&self.zoom_factor) {
            return Err(MemeFillError::InvalidParameter(format!(
                "Zoom factor must be between 1 and {}, got {}",
                MAX_ZOOM_FACTOR, self.zoom_factor
            )));
        }
        if self.fade < RationalTime::ZERO {
            return Err(MemeFillError::InvalidParameter(
                "Fade duration cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Summary of a finished composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionReport {
    /// Frames written to the sink.
    pub frames_written: u64,
    /// Frames that received an overlay.
    pub frames_overlaid: u64,
    /// Segments whose asset could not be loaded.
    pub assets_skipped: u64,
}

/// Encoder settings for [`compose_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub codec: VideoCodec,
    pub crf: Option<u32>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            crf: Some(18),
        }
    }
}

/// Overlay prepared for the segment under the cursor.
struct ActiveOverlay {
    segment_index: usize,
    /// `None` when the asset failed to load; the segment passes through.
    frame: Option<FrameBuffer>,
}

/// Stream `source` into `sink`, filling every segment with its asset.
///
/// The sink is finished on success and aborted on any error, including
/// cancellation. `on_progress` receives `(frames_written, total_hint)`.
pub fn compose<S, K, F>(
    source: &mut S,
    sink: &mut K,
    request: &CompositionRequest,
    cancel: &ExportCancel,
    on_progress: F,
) -> Result<CompositionReport>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    F: FnMut(u64, Option<u64>),
{
    match run(source, sink, request, cancel, on_progress) {
        Ok(report) => {
            sink.finish()?;
            info!(
                frames = report.frames_written,
                overlaid = report.frames_overlaid,
                skipped_assets = report.assets_skipped,
                "Composition finished"
            );
            Ok(report)
        }
        Err(e) => {
            sink.abort();
            Err(e)
        }
    }
}

fn run<S, K, F>(
    source: &mut S,
    sink: &mut K,
    request: &CompositionRequest,
    cancel: &ExportCancel,
    mut on_progress: F,
) -> Result<CompositionReport>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    F: FnMut(u64, Option<u64>),
{
    request.validate()?;

    let (width, height) = source.dimensions();
    let total = source.frame_count_hint();
    let fade = FadeSchedule::new(request.fade, source.frame_rate());
    debug!(
        width,
        height,
        segments = request.segments.len(),
        assets = request.assets.len(),
        fade_frames = fade.fade_frames(),
        "Starting composition"
    );

    let segments = sort_segments(&request.segments);
    let mut cursor = 0usize;
    let mut active: Option<ActiveOverlay> = None;
    let mut report = CompositionReport::default();
    let mut index = 0u64;

    while let Some(mut frame) = source.next_frame()? {
        if cancel.is_cancelled() {
            return Err(MemeFillError::Cancelled);
        }

        // Step past finished segments before testing this frame
        while cursor < segments.len() && segments[cursor].end < index {
            cursor += 1;
        }

        if let Some(&segment) = segments.get(cursor) {
            if segment.contains(index) {
                if active.as_ref().map(|a| a.segment_index) != Some(cursor) {
                    let asset = &request.assets[cursor % request.assets.len()];
                    let overlay = match prepare_overlay(asset, width, height, request.zoom_factor) {
                        Ok(overlay) => Some(overlay),
                        Err(e) => {
                            warn!(asset = %asset.display(), %segment, error = %e, "Skipping unreadable asset");
                            report.assets_skipped += 1;
                            None
                        }
                    };
                    active = Some(ActiveOverlay {
                        segment_index: cursor,
                        frame: overlay,
                    });
                }

                if let Some(overlay) = active.as_ref().and_then(|a| a.frame.as_ref()) {
                    blend_into(&mut frame, overlay, fade.alpha(segment, index))?;
                    report.frames_overlaid += 1;
                }
            }
        }

        sink.write_frame(&frame)?;
        report.frames_written += 1;
        index += 1;

        if index % PROGRESS_INTERVAL == 0 {
            on_progress(index, total);
        }
    }

    on_progress(index, total);
    Ok(report)
}

/// Compose a video file into a new file.
///
/// Fails with [`MemeFillError::SourceUnavailable`] if `input` cannot be
/// opened. A failed or cancelled export leaves no output file behind.
pub fn compose_file<F>(
    input: &Path,
    output: &Path,
    request: &CompositionRequest,
    settings: EncodeSettings,
    cancel: &ExportCancel,
    on_progress: F,
) -> Result<CompositionReport>
where
    F: FnMut(u64, Option<u64>),
{
    request.validate()?;
    let mut decoder = VideoDecoder::open(input)?;
    let (width, height) = decoder.dimensions();
    let job = ExportJob::new(output, width, height, decoder.frame_rate())
        .with_codec(settings.codec)
        .with_crf(settings.crf);
    info!(
        input = %input.display(),
        output = %output.display(),
        codec = ?settings.codec,
        "Exporting filled video"
    );
    let mut encoder = job.start()?;
    compose(&mut decoder, &mut encoder, request, cancel, on_progress)
}
