//! The ordered list of segments that becomes the final video.
//!
//! Segments are laid end to end: each one starts exactly where the previous
//! one stops, so start offsets are derived rather than stored.

use super::segment::{Segment, SegmentKind};

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) {
        self.segments.extend(segments);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Start offset of every segment in the final video.
    pub fn start_times(&self) -> Vec<f64> {
        self.segments
            .iter()
            .scan(0.0, |elapsed, segment| {
                let start = *elapsed;
                *elapsed += segment.duration();
                Some(start)
            })
            .collect()
    }

    pub fn spoken_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Pause)
            .count()
    }
}
