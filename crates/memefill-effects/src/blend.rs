//! Per-pixel alpha blending of an overlay into a frame.

use memefill_core::{FrameBuffer, MemeFillError, Result};

/// Blend `overlay` over `base` in place: `alpha * overlay + (1 - alpha) * base`.
///
/// Color channels round to nearest; the output alpha channel is opaque.
pub fn blend_into(base: &mut FrameBuffer, overlay: &FrameBuffer, alpha: f32) -> Result<()> {
    if base.dimensions() != overlay.dimensions() {
        return Err(MemeFillError::InvalidParameter(format!(
            "Overlay is {}x{}, frame is {}x{}",
            overlay.width, overlay.height, base.width, base.height
        )));
    }

    let a = alpha.clamp(0.0, 1.0);
    let ia = 1.0 - a;

    for (dst, src) in base
        .data
        .chunks_exact_mut(FrameBuffer::BYTES_PER_PIXEL)
        .zip(overlay.data.chunks_exact(FrameBuffer::BYTES_PER_PIXEL))
    {
        for c in 0..3 {
            dst[c] = (src[c] as f32 * a + dst[c] as f32 * ia).round() as u8;
        }
        dst[3] = 255;
    }
    Ok(())
}
