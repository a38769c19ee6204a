//! Loading asset files as overlay images.

use image::RgbaImage;
use memefill_core::{FrameBuffer, MemeFillError, Result};
use memefill_media::decode_first_frame;
use std::path::Path;
use tracing::debug;

use crate::zoom::zoom_crop;

/// Read an asset as an RGBA image.
///
/// Still images and GIFs go through the image decoder (GIFs yield their first
/// frame). `.mp4` assets are decoded with FFmpeg and their first frame is used.
pub fn load_overlay(path: &Path) -> Result<RgbaImage> {
    let is_video = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));

    if is_video {
        let frame = decode_first_frame(path)?;
        let (w, h) = frame.dimensions();
        return RgbaImage::from_raw(w, h, frame.data).ok_or_else(|| {
            MemeFillError::Image(format!("Bad first frame in {}", path.display()))
        });
    }

    let img = image::open(path)
        .map_err(|e| MemeFillError::Image(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), width = img.width(), height = img.height(), "Loaded overlay");
    Ok(img.to_rgba8())
}

/// Load an asset and turn it into a frame-sized overlay.
pub fn prepare_overlay(path: &Path, width: u32, height: u32, zoom: f64) -> Result<FrameBuffer> {
    let image = load_overlay(path)?;
    zoom_crop(&image, width, height, zoom)
}
