//! Mapping between timeline pixels and frame indices.

use memefill_core::Segment;

/// Horizontal scale of a timeline strip showing a whole video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineScale {
    total_frames: u64,
    width: f32,
}

impl TimelineScale {
    /// `total_frames` is clamped to at least 1 so mapping never divides by zero.
    pub fn new(total_frames: u64, width: f32) -> Self {
        Self {
            total_frames: total_frames.max(1),
            width: if width.is_finite() { width.max(0.0) } else { 0.0 },
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Frame under a click at `x` pixels from the left edge.
    ///
    /// Clicks left of the strip map to frame 0; clicks at or past the right
    /// edge map to the last frame.
    pub fn frame_at(&self, x: f32) -> u64 {
        if self.width <= 0.0 || !x.is_finite() {
            return 0;
        }
        let fraction = (x / self.width).clamp(0.0, 1.0) as f64;
        let frame = (fraction * self.total_frames as f64).floor() as u64;
        frame.min(self.total_frames - 1)
    }

    /// Pixel position of the left edge of `frame`.
    pub fn x_for_frame(&self, frame: u64) -> f32 {
        (frame as f64 / self.total_frames as f64 * self.width as f64) as f32
    }

    /// Left and right pixel positions of a segment.
    pub fn span(&self, segment: Segment) -> (f32, f32) {
        (self.x_for_frame(segment.start), self.x_for_frame(segment.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_to_frame() {
        let scale = TimelineScale::new(100, 800.0);
        assert_eq!(scale.frame_at(0.0), 0);
        assert_eq!(scale.frame_at(7.9), 0);
        assert_eq!(scale.frame_at(8.0), 1);
        assert_eq!(scale.frame_at(400.0), 50);
        assert_eq!(scale.frame_at(800.0), 99);
        assert_eq!(scale.frame_at(-20.0), 0);
        assert_eq!(scale.frame_at(5000.0), 99);
    }

    #[test]
    fn test_segment_span() {
        let scale = TimelineScale::new(100, 1000.0);
        let (left, right) = scale.span(Segment::new(20, 29));
        assert!((left - 200.0).abs() < 1e-3);
        assert!((right - 290.0).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_inputs() {
        let scale = TimelineScale::new(0, 500.0);
        assert_eq!(scale.total_frames(), 1);
        assert_eq!(scale.frame_at(250.0), 0);

        let flat = TimelineScale::new(100, 0.0);
        assert_eq!(flat.frame_at(10.0), 0);
        assert_eq!(flat.x_for_frame(50), 0.0);

        assert_eq!(TimelineScale::new(10, f32::NAN).width(), 0.0);
    }
}
