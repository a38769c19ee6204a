//! Export pipeline for writing composited frames to a video file.
//!
//! Raw RGBA8 frames are piped into an FFmpeg subprocess for encoding. The
//! output keeps the input's frame rate and dimensions, except that odd widths
//! or heights are padded by one pixel because yuv420p needs even sizes. A
//! failed or cancelled export deletes whatever FFmpeg had already written.

use memefill_core::{FrameBuffer, FrameRate, MemeFillError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::stream::FrameSink;

// ── Codecs ──────────────────────────────────────────────────────

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 in MP4, the most widely playable choice.
    #[default]
    H264,
    /// MPEG-4 Part 2 ("mp4v"), for players without H.264 support.
    Mpeg4,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Mpeg4 => "mpeg4",
        }
    }

    /// File extension for this codec.
    pub fn extension(self) -> &'static str {
        "mp4"
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = MemeFillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "avc" | "libx264" => Ok(Self::H264),
            "mpeg4" | "mp4v" => Ok(Self::Mpeg4),
            other => Err(MemeFillError::InvalidParameter(format!(
                "Unknown video codec: {other}"
            ))),
        }
    }
}

// ── Export job ───────────────────────────────────────────────────

/// An export job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    /// Output file path.
    pub output_path: PathBuf,
    /// Output width, equal to the source width.
    pub width: u32,
    /// Output height, equal to the source height.
    pub height: u32,
    /// Output frame rate, equal to the source rate.
    pub frame_rate: FrameRate,
    /// Video codec.
    pub codec: VideoCodec,
    /// CRF value for H.264 (0-51, lower = better).
    pub crf: Option<u32>,
}

impl ExportJob {
    /// Create a new export job with default codec settings.
    pub fn new(
        output_path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        frame_rate: FrameRate,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            width,
            height,
            frame_rate,
            codec: VideoCodec::H264,
            crf: Some(18),
        }
    }

    /// Set the codec.
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the CRF (ignored by codecs without a CRF mode).
    pub fn with_crf(mut self, crf: Option<u32>) -> Self {
        self.crf = crf;
        self
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Input from pipe (raw frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgba".into(),
            "-video_size".into(),
            format!("{}x{}", self.width, self.height),
            "-framerate".into(),
            format!("{}/{}", self.frame_rate.numerator, self.frame_rate.denominator),
            "-i".into(),
            "pipe:0".into(),
        ]);

        args.extend_from_slice(&["-c:v".into(), self.codec.ffmpeg_encoder().into()]);

        if self.codec == VideoCodec::H264 {
            if let Some(crf) = self.crf {
                args.extend_from_slice(&["-crf".into(), crf.to_string()]);
            }
        } else {
            args.extend_from_slice(&["-q:v".into(), "3".into()]);
        }

        if self.width % 2 == 1 || self.height % 2 == 1 {
            args.extend_from_slice(&["-vf".into(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".into()]);
        }

        args.extend_from_slice(&[
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
        ]);

        args.push(self.output_path.to_string_lossy().into_owned());

        args
    }

    /// Spawn FFmpeg and return an encoder ready to accept frames.
    pub fn start(&self) -> Result<VideoEncoder> {
        VideoEncoder::start(self.clone())
    }
}

// ── Encoder ──────────────────────────────────────────────────────

/// A running FFmpeg encode fed through stdin.
pub struct VideoEncoder {
    job: ExportJob,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames_written: u64,
}

impl VideoEncoder {
    /// Spawn the FFmpeg process for `job`.
    pub fn start(job: ExportJob) -> Result<Self> {
        if job.width == 0 || job.height == 0 {
            return Err(MemeFillError::InvalidParameter(format!(
                "Cannot export a {}x{} video",
                job.width, job.height
            )));
        }

        let args = job.ffmpeg_args();
        debug!(?args, "Spawning ffmpeg encoder");

        let mut child = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MemeFillError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MemeFillError::Encoder("Failed to open ffmpeg stdin".into()))?;

        info!(
            output = %job.output_path.display(),
            width = job.width,
            height = job.height,
            rate = %job.frame_rate,
            codec = job.codec.ffmpeg_encoder(),
            "Export started"
        );

        Ok(Self {
            job,
            child: Some(child),
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    fn kill_and_remove(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        remove_partial_output(&self.job.output_path);
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        if frame.dimensions() != (self.job.width, self.job.height) {
            return Err(MemeFillError::Encoder(format!(
                "Frame is {}x{}, export expects {}x{}",
                frame.width, frame.height, self.job.width, self.job.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MemeFillError::Encoder("Encoder already finished".into()))?;
        stdin.write_all(&frame.data).map_err(|e| {
            MemeFillError::Encoder(format!(
                "Failed to write frame {}: {e}",
                self.frames_written
            ))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Close stdin to signal end-of-stream
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Err(MemeFillError::Encoder("Encoder already finished".into()));
        };

        let status = child
            .wait()
            .map_err(|e| MemeFillError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;

        if !status.success() {
            remove_partial_output(&self.job.output_path);
            return Err(MemeFillError::Encoder(format!(
                "ffmpeg exited with status: {}",
                status
            )));
        }

        info!(
            output = %self.job.output_path.display(),
            frames = self.frames_written,
            "Export finished"
        );
        Ok(())
    }

    fn abort(&mut self) {
        warn!(output = %self.job.output_path.display(), "Export aborted");
        self.kill_and_remove();
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        // Dropped without finish(): the output is incomplete.
        if self.child.is_some() {
            self.kill_and_remove();
        }
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
    }
}

/// Handle for cancelling an in-progress export.
#[derive(Debug, Clone)]
pub struct ExportCancel(Arc<AtomicBool>);

impl ExportCancel {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ExportCancel {
    fn default() -> Self {
        Self::new()
    }
}
