use std::time::Duration;

use bytes::Bytes;

/// An encoded video frame with a `Bytes` payload buffer.
///
/// The payload is reference counted; cloning a `Frame` never copies frame
/// data. Timestamps use `None` to mirror an unset/invalid clock value, in
/// which case position tracking treats the frame as "unchanged position".
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Copy free payload buffer
    pub data: Bytes,
    /// Presentation timestamp
    pub pts: Option<Duration>,
    /// Display duration of the frame
    pub duration: Option<Duration>,
    /// Whether this frame is self contained (a delta frame needs a prior
    /// reference frame to decode)
    pub keyframe: bool,
}

impl Frame {
    pub fn new(
        data: Bytes,
        pts: Option<Duration>,
        duration: Option<Duration>,
        keyframe: bool,
    ) -> Self {
        Self {
            data,
            pts,
            duration,
            keyframe,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    // Helper for easier comparison in tests, ignoring payload bytes
    pub fn description(&self) -> String {
        format!(
            "{}@{:?}",
            if self.keyframe { "key" } else { "delta" },
            self.pts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_payload() {
        let frame = Frame::new(
            Bytes::from_static(b"payload"),
            Some(Duration::from_millis(40)),
            Some(Duration::from_millis(40)),
            true,
        );
        let clone = frame.clone();
        // Bytes clones share the same backing storage.
        assert_eq!(frame.data.as_ptr(), clone.data.as_ptr());
        assert_eq!(clone.size(), 7);
    }

    #[test]
    fn test_description() {
        let frame = Frame::new(Bytes::new(), None, None, false);
        assert!(frame.description().starts_with("delta@"));
    }
}
