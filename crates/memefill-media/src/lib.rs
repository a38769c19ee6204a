//! MemeFill Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - Sequential frame sources and sinks (the seam the detector and compositor use)
//! - Media file probing with ffprobe
//! - Video decoding to RGBA8 through an FFmpeg subprocess
//! - Encoding composited frames back to a video file

pub mod decoder;
pub mod export;
pub mod probe;
pub mod stream;

pub use decoder::{decode_first_frame, VideoDecoder};
pub use export::{ExportCancel, ExportJob, VideoCodec, VideoEncoder};
pub use probe::MediaProbe;
pub use stream::{FrameSink, FrameSource, MemorySink, MemorySource};

use tracing::{info, warn};

/// Check the FFmpeg toolchain once at startup and log what was found.
///
/// Returns `true` when an `ffmpeg` binary is runnable.
pub fn init() -> bool {
    let installed = ffmpeg_sidecar::command::ffmpeg_is_installed();
    if installed {
        info!(
            ffmpeg = %ffmpeg_sidecar::paths::ffmpeg_path().display(),
            ffprobe = %ffmpeg_sidecar::ffprobe::ffprobe_path().display(),
            "MemeFill media initialized"
        );
    } else {
        warn!("ffmpeg was not found; decoding and export will fail");
    }
    installed
}
