//! Sequential frame sources and sinks.
//!
//! Detection and composition only ever walk a video front to back, so the
//! whole pipeline is written against these two traits. The FFmpeg decoder and
//! encoder implement them for real files; the in-memory variants back tests
//! and synthetic inputs.

use memefill_core::{FrameBuffer, FrameRate, MemeFillError, Result};
use std::collections::VecDeque;

/// A video that yields frames in presentation order until exhausted.
pub trait FrameSource {
    /// Frame rate of the stream.
    fn frame_rate(&self) -> FrameRate;

    /// Frame dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Decode the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<FrameBuffer>>;

    /// Total frame count, when the container reports one.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// A destination that accepts frames in order.
pub trait FrameSink {
    /// Append one frame.
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Flush and close the output. No frames may be written afterwards.
    fn finish(&mut self) -> Result<()>;

    /// Abandon the output, discarding anything partially written.
    fn abort(&mut self) {}
}

/// A frame source backed by a list of frames held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    frame_rate: FrameRate,
    width: u32,
    height: u32,
    frames: VecDeque<FrameBuffer>,
    total: u64,
}

impl MemorySource {
    /// Create a source from frames that all share the given dimensions.
    pub fn new(
        frame_rate: FrameRate,
        width: u32,
        height: u32,
        frames: Vec<FrameBuffer>,
    ) -> Result<Self> {
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != (width, height))
        {
            return Err(MemeFillError::InvalidParameter(format!(
                "Frame {} is {}x{}, expected {}x{}",
                i, f.width, f.height, width, height
            )));
        }
        let total = frames.len() as u64;
        Ok(Self {
            frame_rate,
            width,
            height,
            frames: frames.into(),
            total,
        })
    }

    /// Build a source of solid gray frames from per-frame gray levels.
    pub fn from_gray_levels(
        frame_rate: FrameRate,
        width: u32,
        height: u32,
        levels: &[u8],
    ) -> Self {
        let frames = levels
            .iter()
            .map(|&v| FrameBuffer::solid(width, height, v, v, v))
            .collect::<Vec<_>>();
        let total = frames.len() as u64;
        Self {
            frame_rate,
            width,
            height,
            frames: frames.into(),
            total,
        }
    }
}

impl FrameSource for MemorySource {
    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<FrameBuffer>> {
        Ok(self.frames.pop_front())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

/// A frame sink that keeps every written frame in memory.
#[derive(Debug, Clone)]
pub struct MemorySink {
    /// Frame rate the output was opened with.
    pub frame_rate: FrameRate,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Frames written so far, in order.
    pub frames: Vec<FrameBuffer>,
    finished: bool,
}

impl MemorySink {
    /// Create an empty sink with the given output format.
    pub fn new(frame_rate: FrameRate, width: u32, height: u32) -> Self {
        Self {
            frame_rate,
            width,
            height,
            frames: Vec::new(),
            finished: false,
        }
    }

    /// Whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        if self.finished {
            return Err(MemeFillError::Encoder("Sink already finished".into()));
        }
        if frame.dimensions() != (self.width, self.height) {
            return Err(MemeFillError::Encoder(format!(
                "Frame is {}x{}, sink expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
    }
}
