use std::time::Duration;

/// Declared format of a raw segment announcement.
///
/// Duration accounting inside the loop requires a time base, so every
/// non-time format is normalized to a degenerate closed time segment
/// (start = 0, stop unknown) when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentFormat {
    #[default]
    Time,
    Bytes,
    Buffers,
    Undefined,
}

/// A raw segment announcement as received from upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub format: SegmentFormat,
    /// Start of the segment in stream time.
    pub start: Duration,
    /// End of the segment, unknown for live streams.
    pub stop: Option<Duration>,
    /// Last known position inside the segment.
    pub position: Option<Duration>,
}

impl Segment {
    /// An open-ended time segment starting at `start`.
    pub fn time(start: Duration) -> Self {
        Self {
            format: SegmentFormat::Time,
            start,
            stop: None,
            position: None,
        }
    }

    pub fn is_time(&self) -> bool {
        self.format == SegmentFormat::Time
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::time(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_segment_is_open_ended() {
        let segment = Segment::time(Duration::from_secs(2));
        assert!(segment.is_time());
        assert_eq!(segment.start, Duration::from_secs(2));
        assert_eq!(segment.stop, None);
        assert_eq!(segment.position, None);
    }

    #[test]
    fn test_non_time_format() {
        let segment = Segment {
            format: SegmentFormat::Bytes,
            ..Segment::default()
        };
        assert!(!segment.is_time());
    }
}
