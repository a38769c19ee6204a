//! Frame-index segments.
//!
//! A segment is an inclusive `[start, end]` range of frame indices. Detection
//! produces ordered, disjoint segments; manual edits may leave segments out of
//! order, adjacent or overlapping, so nothing here enforces ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MemeFillError;

/// An inclusive range of frame indices.
///
/// Deserialization rejects `end < start` instead of clamping, so a corrupt
/// segment file fails to load rather than silently changing meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSegment")]
pub struct Segment {
    /// First frame of the segment.
    pub start: u64,
    /// Last frame of the segment (inclusive).
    pub end: u64,
}

impl Segment {
    /// Create a segment. `end` is clamped up to `start` so the range is never inverted.
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of frames covered, counting both ends.
    #[inline]
    pub fn len(self) -> u64 {
        self.end - self.start + 1
    }

    /// A segment always covers at least one frame.
    #[inline]
    pub fn is_empty(self) -> bool {
        false
    }

    /// Check if a frame lies within `[start, end]`.
    #[inline]
    pub fn contains(self, frame: u64) -> bool {
        self.start <= frame && frame <= self.end
    }

    /// Check if a frame lies strictly inside `(start, end)`.
    #[inline]
    pub fn contains_interior(self, frame: u64) -> bool {
        self.start < frame && frame < self.end
    }

    /// Check if two segments share at least one frame.
    #[inline]
    pub fn overlaps(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[derive(Deserialize)]
struct RawSegment {
    start: u64,
    end: u64,
}

impl TryFrom<RawSegment> for Segment {
    type Error = MemeFillError;

    fn try_from(raw: RawSegment) -> Result<Self, Self::Error> {
        Self::checked(raw.start, raw.end)
    }
}

impl Segment {
    /// Create a segment, rejecting an inverted range.
    pub fn checked(start: u64, end: u64) -> crate::Result<Self> {
        if end < start {
            return Err(MemeFillError::InvalidParameter(format!(
                "Segment ends before it starts: [{start}, {end}]"
            )));
        }
        Ok(Self { start, end })
    }
}

impl From<(u64, u64)> for Segment {
    fn from((start, end): (u64, u64)) -> Self {
        Self::new(start, end)
    }
}

/// Return the segments ordered by start frame (then end), keeping duplicates.
pub fn sort_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut sorted = segments.to_vec();
    sorted.sort_by_key(|s| (s.start, s.end));
    sorted
}

/// Sort segments and merge any that overlap, producing a disjoint ordered list.
///
/// Adjacent segments (`a.end + 1 == b.start`) are left separate.
pub fn normalize_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in sort_segments(segments) {
        match merged.last_mut() {
            Some(last) if last.overlaps(seg) => last.end = last.end.max(seg.end),
            _ => merged.push(seg),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_len_and_contains() {
        let seg = Segment::new(20, 29);
        assert_eq!(seg.len(), 10);
        assert!(seg.contains(20) && seg.contains(29));
        assert!(!seg.contains(30));
        assert!(!seg.contains_interior(20));
        assert!(seg.contains_interior(25));
    }

    #[test]
    fn test_inverted_range_clamped() {
        assert_eq!(Segment::new(10, 3), Segment::new(10, 10));
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let err = serde_json::from_str::<Segment>(r#"{"start":30,"end":20}"#).unwrap_err();
        assert!(err.to_string().contains("ends before it starts"));
        let ok: Segment = serde_json::from_str(r#"{"start":20,"end":20}"#).unwrap();
        assert_eq!(ok, Segment::new(20, 20));
        assert!(Segment::checked(5, 4).is_err());
    }

    #[test]
    fn test_normalize_merges_overlaps_only() {
        let segs = vec![
            Segment::new(30, 40),
            Segment::new(0, 5),
            Segment::new(35, 50),
            Segment::new(6, 8),
        ];
        assert_eq!(
            normalize_segments(&segs),
            vec![Segment::new(0, 5), Segment::new(6, 8), Segment::new(30, 50)]
        );
    }

    #[test]
    fn test_split_halves_share_frame_and_merge_back() {
        // Split produces (start, f) and (f, end), which overlap on f.
        let halves = vec![Segment::new(10, 15), Segment::new(15, 20)];
        assert_eq!(normalize_segments(&halves), vec![Segment::new(10, 20)]);
    }

    proptest! {
        #[test]
        fn normalized_is_sorted_and_disjoint(raw in prop::collection::vec((0u64..500, 0u64..50), 0..40)) {
            let segs: Vec<Segment> = raw.iter().map(|&(s, l)| Segment::new(s, s + l)).collect();
            let norm = normalize_segments(&segs);
            for pair in norm.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
            for seg in &segs {
                prop_assert!(norm.iter().any(|n| n.start <= seg.start && seg.end <= n.end));
            }
        }
    }
}
