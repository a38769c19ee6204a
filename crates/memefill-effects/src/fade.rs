//! Fade-out schedule at the tail of a segment.

use memefill_core::{FrameRate, RationalTime, Segment};

/// Opacity ramp over the last frames of each segment.
///
/// With `fade_frames = n`, the overlay is fully opaque up to `end - n` and
/// falls linearly to zero on the segment's last frame. `n = 0` disables the
/// ramp entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FadeSchedule {
    fade_frames: u64,
}

impl FadeSchedule {
    /// Convert a fade duration to whole frames, rounding to nearest.
    pub fn new(fade: RationalTime, rate: FrameRate) -> Self {
        let frames = fade.to_frames_rounded(rate).max(0) as u64;
        Self::from_frames(frames)
    }

    pub fn from_millis(millis: u64, rate: FrameRate) -> Self {
        let millis = u32::try_from(millis).unwrap_or(u32::MAX);
        Self::new(RationalTime::from_millis(i64::from(millis)), rate)
    }

    pub fn from_frames(fade_frames: u64) -> Self {
        Self { fade_frames }
    }

    pub fn fade_frames(&self) -> u64 {
        self.fade_frames
    }

    /// First frame of the ramp for `segment`.
    pub fn fade_start(&self, segment: Segment) -> u64 {
        segment.end.saturating_sub(self.fade_frames)
    }

    /// Overlay opacity for `frame` inside `segment`, in `[0, 1]`.
    pub fn alpha(&self, segment: Segment, frame: u64) -> f32 {
        if self.fade_frames == 0 || frame < self.fade_start(segment) {
            return 1.0;
        }
        let remaining = segment.end.saturating_sub(frame) as f64;
        (remaining / self.fade_frames as f64).clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_half_second_at_10fps() {
        let fade = FadeSchedule::from_millis(500, FrameRate::FPS_10);
        let seg = Segment::new(20, 29);
        assert_eq!(fade.fade_frames(), 5);
        assert_eq!(fade.fade_start(seg), 24);

        assert_eq!(fade.alpha(seg, 20), 1.0);
        assert_eq!(fade.alpha(seg, 24), 1.0);
        assert_eq!(fade.alpha(seg, 29), 0.0);
        let ramp: Vec<f32> = (24..=29).map(|f| fade.alpha(seg, f)).collect();
        assert!(ramp.windows(2).all(|w| w[1] < w[0]));
        assert!((fade.alpha(seg, 27) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_zero_fade_is_fully_opaque() {
        let fade = FadeSchedule::from_millis(0, FrameRate::FPS_30);
        let seg = Segment::new(20, 29);
        for f in 20..=29 {
            assert_eq!(fade.alpha(seg, f), 1.0);
        }
    }

    #[test]
    fn test_rounding_to_frames() {
        // 0.5s at 29.97 is 14.985 frames
        assert_eq!(
            FadeSchedule::from_millis(500, FrameRate::FPS_29_97).fade_frames(),
            15
        );
        // 0.05s at 10fps is exactly half a frame, rounds away from zero
        assert_eq!(FadeSchedule::from_millis(50, FrameRate::FPS_10).fade_frames(), 1);
    }

    #[test]
    fn test_fade_longer_than_segment() {
        let fade = FadeSchedule::from_frames(10);
        let seg = Segment::new(3, 5);
        assert_eq!(fade.fade_start(seg), 0);
        assert!((fade.alpha(seg, 3) - 0.2).abs() < 1e-6);
        assert_eq!(fade.alpha(seg, 5), 0.0);
    }

    proptest! {
        #[test]
        fn alpha_is_bounded_and_non_increasing(start in 0u64..1000, len in 0u64..200, n in 0u64..100) {
            let seg = Segment::new(start, start + len);
            let fade = FadeSchedule::from_frames(n);
            let mut prev = f32::INFINITY;
            for f in seg.start..=seg.end {
                let a = fade.alpha(seg, f);
                prop_assert!((0.0..=1.0).contains(&a));
                prop_assert!(a <= prev);
                prev = a;
            }
        }
    }
}
