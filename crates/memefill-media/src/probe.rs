//! Media file probing to get metadata without a full decode.

use memefill_core::{FrameRate, MemeFillError, RationalTime, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Information about the primary video stream of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Video codec name as reported by ffprobe
    pub codec: String,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Display rotation in degrees. `width` and `height` are already swapped
    /// for quarter turns, matching the frames FFmpeg decodes.
    #[serde(default)]
    pub rotation: i32,
    /// Frame rate of the video stream
    pub frame_rate: FrameRate,
    /// Frame count, when the container records it
    pub frame_count: Option<u64>,
    /// Duration, when known
    pub duration: Option<RationalTime>,
}

// ── ffprobe JSON shape ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Rotation from the display matrix, else the legacy `rotate` tag,
    /// normalized to 0..360.
    fn rotation(&self) -> i32 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360) as i32
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl MediaProbe {
    /// Probe a media file with ffprobe.
    ///
    /// Any failure to open or interpret the file is reported as
    /// [`MemeFillError::SourceUnavailable`].
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.is_file() {
            return Err(MemeFillError::SourceUnavailable(format!(
                "File not found: {}",
                path_str
            )));
        }

        let output = Command::new(ffmpeg_sidecar::ffprobe::ffprobe_path())
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name,width,height,r_frame_rate,avg_frame_rate,nb_frames\
                 :stream_tags=rotate:stream_side_data=rotation",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                MemeFillError::SourceUnavailable(format!("Failed to run ffprobe: {e}"))
            })?;

        if !output.status.success() {
            return Err(MemeFillError::SourceUnavailable(format!(
                "ffprobe could not open {}: {}",
                path_str,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe = Self::from_ffprobe_json(&path_str, &output.stdout)?;
        debug!(
            path = %probe.path,
            width = probe.width,
            height = probe.height,
            rate = %probe.frame_rate,
            frames = ?probe.frame_count,
            "Probed video"
        );
        Ok(probe)
    }

    /// Interpret the JSON printed by `ffprobe -of json`.
    pub fn from_ffprobe_json(path: &str, json: &[u8]) -> Result<Self> {
        let raw: ProbeOutput = serde_json::from_slice(json).map_err(|e| {
            MemeFillError::SourceUnavailable(format!("Unreadable ffprobe output: {e}"))
        })?;

        let stream = raw.streams.into_iter().next().ok_or_else(|| {
            MemeFillError::SourceUnavailable(format!("No video stream in {}", path))
        })?;

        let rotation = stream.rotation();
        let (width, height) = match (stream.width, stream.height) {
            // FFmpeg auto-rotates on decode, so quarter turns swap the frame size
            (Some(w), Some(h)) if w > 0 && h > 0 && rotation % 180 == 90 => (h, w),
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(MemeFillError::SourceUnavailable(format!(
                    "Video stream in {} has no dimensions",
                    path
                )))
            }
        };

        // r_frame_rate is the stream's base rate; avg_frame_rate covers VFR files
        // whose base rate is reported as 0/0.
        let frame_rate = [stream.r_frame_rate, stream.avg_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|r| r.parse::<FrameRate>().ok())
            .ok_or_else(|| {
                MemeFillError::SourceUnavailable(format!("Unknown frame rate for {}", path))
            })?;

        let duration = raw
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .map(|secs| RationalTime::from_millis((secs * 1000.0).round() as i64));

        Ok(Self {
            path: path.to_string(),
            codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
            width,
            height,
            rotation,
            frame_rate,
            frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
            duration,
        })
    }

    /// Best available frame count: the container's count, else duration × rate.
    pub fn estimated_frames(&self) -> Option<u64> {
        self.frame_count.or_else(|| {
            self.duration
                .map(|d| d.to_frames_rounded(self.frame_rate).max(0) as u64)
        })
    }
}
