//! Zoom-and-center-crop of overlay images.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use memefill_core::{FrameBuffer, MemeFillError, Result};

use crate::MAX_ZOOMED_PIXELS;

/// Scale `image` to `(width * zoom, height * zoom)` and cut the centered
/// `width x height` window out of it.
///
/// The source aspect ratio is ignored, so every asset fills the frame. Target
/// sizes are truncated toward zero. A zoomed size above
/// [`MAX_ZOOMED_PIXELS`] is rejected before anything is allocated.
pub fn zoom_crop(image: &RgbaImage, width: u32, height: u32, zoom: f64) -> Result<FrameBuffer> {
    if !zoom.is_finite() || zoom < 1.0 {
        return Err(MemeFillError::InvalidParameter(format!(
            "Zoom factor must be at least 1, got {}",
            zoom
        )));
    }
    if width == 0 || height == 0 {
        return Err(MemeFillError::InvalidParameter(format!(
            "Cannot build a {}x{} overlay",
            width, height
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(MemeFillError::Image("Overlay image is empty".into()));
    }

    let (zoomed_w, zoomed_h) = match (scaled(width, zoom), scaled(height, zoom)) {
        (Some(w), Some(h)) if u64::from(w) * u64::from(h) <= MAX_ZOOMED_PIXELS => (w, h),
        _ => {
            return Err(MemeFillError::InvalidParameter(format!(
                "Zoom factor {} makes a {}x{} overlay too large",
                zoom, width, height
            )))
        }
    };
    let zoomed = imageops::resize(image, zoomed_w, zoomed_h, FilterType::Triangle);

    let x = (zoomed_w - width) / 2;
    let y = (zoomed_h - height) / 2;
    let cropped = imageops::crop_imm(&zoomed, x, y, width, height).to_image();

    FrameBuffer::from_rgba(width, height, cropped.into_raw())
}

fn scaled(size: u32, zoom: f64) -> Option<u32> {
    let target = (f64::from(size) * zoom).trunc();
    if target > f64::from(u32::MAX) {
        None
    } else {
        Some((target as u32).max(size))
    }
}
