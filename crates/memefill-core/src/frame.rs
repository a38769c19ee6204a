//! Frame buffer type for decoded video frames in CPU memory.
//!
//! Frames are always tightly packed RGBA8 so they can be piped straight
//! to and from an FFmpeg `rawvideo` stream without any repacking.

use crate::error::{MemeFillError, Result};

/// ITU-R BT.601 luma weights, matching the usual BGR→gray conversion.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// A video frame in CPU memory (packed RGBA8, no row padding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Bytes per RGBA8 pixel.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Create a new, fully transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
        }
    }

    /// Wrap existing RGBA8 bytes, checking the length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(MemeFillError::InvalidParameter(format!(
                "RGBA buffer for {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create an opaque frame filled with a single color.
    pub fn solid(width: u32, height: u32, r: u8, g: u8, b: u8) -> Self {
        let mut frame = Self::new(width, height);
        for px in frame.data.chunks_exact_mut(Self::BYTES_PER_PIXEL) {
            px.copy_from_slice(&[r, g, b, 255]);
        }
        frame
    }

    /// Bytes needed for a frame of the given dimensions.
    #[inline]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    /// Frame dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA value of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Mean luma of the frame on a 0-255 scale. Alpha is ignored.
    ///
    /// An empty frame reports 0.0.
    pub fn mean_luma(&self) -> f64 {
        let pixel_count = self.width as usize * self.height as usize;
        if pixel_count == 0 {
            return 0.0;
        }

        let total: f64 = self
            .data
            .chunks_exact(Self::BYTES_PER_PIXEL)
            .map(|px| LUMA_R * px[0] as f64 + LUMA_G * px[1] as f64 + LUMA_B * px[2] as f64)
            .sum();

        total / pixel_count as f64
    }
}
