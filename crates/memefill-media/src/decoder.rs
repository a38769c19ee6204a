//! Video decoder using an FFmpeg subprocess.
//!
//! FFmpeg decodes the file to raw RGBA8 on stdout and frames are read off
//! the pipe one at a time. The binary is located through ffmpeg-sidecar so
//! no FFmpeg development headers are needed. FFmpeg applies the stream's
//! display rotation, so frames arrive at the probed (display) size.

use memefill_core::{FrameBuffer, FrameRate, MemeFillError, Result};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

use crate::probe::MediaProbe;
use crate::stream::FrameSource;

/// Sequential video decoder producing RGBA8 frames.
pub struct VideoDecoder {
    probe: MediaProbe,
    child: Child,
    stdout: ChildStdout,
    current_frame: u64,
    finished: bool,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    ///
    /// Fails with [`MemeFillError::SourceUnavailable`] if the file is missing,
    /// has no video stream or FFmpeg cannot be started.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let probe = MediaProbe::probe(path)?;

        info!(
            path = %probe.path,
            width = probe.width,
            height = probe.height,
            rate = %probe.frame_rate,
            "Opening video file"
        );

        let mut child = Command::new(ffmpeg_sidecar::paths::ffmpeg_path())
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map",
                "0:v:0",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MemeFillError::SourceUnavailable(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MemeFillError::SourceUnavailable("Failed to open ffmpeg stdout".into())
        })?;

        Ok(Self {
            probe,
            child,
            stdout,
            current_frame: 0,
            finished: false,
        })
    }

    /// Decode the next frame, returning it as an RGBA8 FrameBuffer.
    pub fn decode_frame(&mut self) -> Result<Option<FrameBuffer>> {
        if self.finished {
            return Ok(None);
        }

        let (width, height) = (self.probe.width, self.probe.height);
        let mut data = vec![0u8; FrameBuffer::byte_len(width, height)];
        let mut filled = 0;
        while filled < data.len() {
            match self.stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(MemeFillError::Decoder(format!(
                        "Failed to read frame {}: {e}",
                        self.current_frame
                    )))
                }
            }
        }

        if filled < data.len() {
            if filled > 0 {
                warn!(
                    frame = self.current_frame,
                    bytes = filled,
                    "Discarding truncated trailing frame"
                );
            }
            self.finish_process()?;
            return Ok(None);
        }

        self.current_frame += 1;
        FrameBuffer::from_rgba(width, height, data).map(Some)
    }

    fn finish_process(&mut self) -> Result<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| MemeFillError::Decoder(format!("Failed to wait for ffmpeg: {e}")))?;
        debug!(frames = self.current_frame, %status, "Decoder reached end of stream");
        if !status.success() && self.current_frame == 0 {
            return Err(MemeFillError::SourceUnavailable(format!(
                "ffmpeg could not decode {}: {}",
                self.probe.path, status
            )));
        }
        Ok(())
    }
}

impl FrameSource for VideoDecoder {
    fn frame_rate(&self) -> FrameRate {
        self.probe.frame_rate
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.probe.width, self.probe.height)
    }

    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        self.decode_frame()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.probe.estimated_frames()
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Decode only the first frame of a video file.
pub fn decode_first_frame<P: AsRef<Path>>(path: P) -> Result<FrameBuffer> {
    let path = path.as_ref();
    let mut decoder = VideoDecoder::open(path)?;
    decoder.decode_frame()?.ok_or_else(|| {
        MemeFillError::Decoder(format!("{} contains no frames", path.display()))
    })
}
