use std::time::Duration;

use crate::segment::Segment;

/// A control event traveling with the frame stream.
///
/// Only `Segment` and `Gap` events are ever held in the pre-record queue
/// (they must be replayed ahead of buffered frames on a drain); the rest
/// either drive the loop's state machine or pass straight through.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// New segment announcement for position tracking.
    Segment(Segment),
    /// A hole in the stream: no frames for `duration` starting at `timestamp`.
    Gap {
        timestamp: Duration,
        duration: Option<Duration>,
    },
    /// End of stream.
    Eos,
    /// Application-defined event flowing downstream, matched by name.
    CustomDownstream { name: String },
    /// Application-defined event flowing upstream, matched by name.
    CustomUpstream { name: String },
    /// Seek/flush protocol begin.
    FlushStart,
    /// Seek/flush protocol end; `reset_time` requests a fresh timeline.
    FlushStop { reset_time: bool },
    /// Any other event; forwarded untouched and never queued.
    Other { name: &'static str },
}

impl ControlEvent {
    pub fn custom_downstream(name: impl Into<String>) -> Self {
        Self::CustomDownstream { name: name.into() }
    }

    pub fn custom_upstream(name: impl Into<String>) -> Self {
        Self::CustomUpstream { name: name.into() }
    }

    /// Whether the event is replayed from the queue on a drain.
    pub fn is_replayable(&self) -> bool {
        matches!(self, Self::Segment(_) | Self::Gap { .. })
    }

    /// Short tag for log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Segment(_) => "segment",
            Self::Gap { .. } => "gap",
            Self::Eos => "eos",
            Self::CustomDownstream { .. } => "custom-downstream",
            Self::CustomUpstream { .. } => "custom-upstream",
            Self::FlushStart => "flush-start",
            Self::FlushStop { .. } => "flush-stop",
            Self::Other { .. } => "other",
        }
    }
}
