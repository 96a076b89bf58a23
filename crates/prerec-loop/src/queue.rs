//! The pre-record queue.
//!
//! An ordered collection of frames and the subset of control events that
//! must be replayed on a drain (segment updates and gaps). Every frame is
//! tagged with the GOP it belongs to so the pruner can discard whole GOPs
//! off the head. The queue also maintains the buffer/byte/duration level
//! and the input/output timeline bookkeeping that goes with enqueue and
//! dequeue.

use std::collections::VecDeque;
use std::time::Duration;

use prerec_types::{ControlEvent, Frame};
use tracing::{debug, trace, warn};

use crate::timeline::{Side, Timeline};

/// Aggregate fill level of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Level {
    pub buffers: usize,
    pub bytes: u64,
    pub duration: Duration,
}

/// A queued frame tagged with the GOP it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueuedFrame {
    pub frame: Frame,
    pub gop_id: u64,
}

/// One slot of the pre-record queue.
///
/// Each slot owns exactly one handle; `dequeue` moves that ownership to the
/// caller, who must forward it or drop it exactly once.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueueItem {
    Frame(QueuedFrame),
    Event(ControlEvent),
}

/// FIFO of frames and replayable control events with GOP bookkeeping.
#[derive(Debug)]
pub(crate) struct ItemQueue {
    name: String,
    items: VecDeque<QueueItem>,
    level: Level,
    /// Most recently assigned GOP id.
    newest_gop_id: u64,
    /// GOP id at the head of the queue.
    oldest_gop_id: u64,
    /// Set when a segment queued against an empty queue was already applied
    /// to the output side; the next dequeued segment is a skipped duplicate.
    segment_fast_forwarded: bool,
}

impl ItemQueue {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: VecDeque::new(),
            level: Level::default(),
            newest_gop_id: 0,
            oldest_gop_id: 0,
            segment_fast_forwarded: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn level(&self) -> Level {
        self.level
    }

    pub(crate) fn peek(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    pub(crate) fn oldest_gop_id(&self) -> u64 {
        self.oldest_gop_id
    }

    pub(crate) fn set_oldest_gop_id(&mut self, gop_id: u64) {
        self.oldest_gop_id = gop_id;
    }

    /// Number of distinct GOPs currently queued.
    pub(crate) fn queued_gop_count(&self) -> u64 {
        if self.level.buffers == 0 {
            0
        } else {
            self.newest_gop_id - self.oldest_gop_id + 1
        }
    }

    /// Keep the level's duration in sync with the timeline. An empty buffer
    /// always reads as zero duration.
    fn refresh_duration(&mut self, timeline: &mut Timeline) {
        self.level.duration = if self.level.buffers == 0 {
            Duration::ZERO
        } else {
            timeline.buffered_duration()
        };
    }

    /// Append a frame, assigning its GOP id and updating the level and the
    /// input-side timeline.
    pub(crate) fn enqueue_frame(&mut self, frame: Frame, timeline: &mut Timeline) {
        if frame.keyframe {
            self.newest_gop_id += 1;
        }
        let gop_id = self.newest_gop_id;

        if self.level.buffers == 0 {
            if !frame.keyframe {
                // Upstream contract violation: every GOP must open with a
                // keyframe. Queue it anyway; the pruner recovers.
                warn!(
                    "{} first queued frame of gop {} is not a keyframe",
                    self.name, gop_id
                );
            }
            self.oldest_gop_id = gop_id;
        }

        self.level.buffers += 1;
        self.level.bytes += frame.size() as u64;
        timeline.apply_position(Side::Input, frame.pts, frame.duration);
        self.refresh_duration(timeline);

        trace!(
            "{} queued {} (gop {}, {} buffers, {:?} buffered)",
            self.name,
            frame.description(),
            gop_id,
            self.level.buffers,
            self.level.duration
        );
        self.items.push_back(QueueItem::Frame(QueuedFrame { frame, gop_id }));
    }

    /// Append a replayable control event (segment update or gap).
    ///
    /// A segment queued while the queue is empty is also applied to the
    /// output side right away, so a consumer connected before the next
    /// drain sees a current segment; the queued copy is then a duplicate
    /// and gets skipped at dequeue time.
    pub(crate) fn enqueue_control(&mut self, event: ControlEvent, timeline: &mut Timeline) {
        match &event {
            ControlEvent::Segment(segment) => {
                timeline.apply_segment(Side::Input, segment);
                if self.items.is_empty() {
                    debug!("{} segment applied to output side (empty queue)", self.name);
                    timeline.apply_segment(Side::Output, segment);
                    self.segment_fast_forwarded = true;
                }
            }
            ControlEvent::Gap {
                timestamp,
                duration,
            } => {
                timeline.apply_position(Side::Input, Some(*timestamp), *duration);
            }
            other => {
                warn!("{} refusing to queue {} event", self.name, other.type_name());
                return;
            }
        }
        self.refresh_duration(timeline);
        self.items.push_back(QueueItem::Event(event));
    }

    /// Pop the oldest item, applying its output-side accounting.
    pub(crate) fn dequeue(&mut self, timeline: &mut Timeline) -> Option<QueueItem> {
        let item = self.items.pop_front()?;
        match &item {
            QueueItem::Frame(queued) => {
                self.level.buffers -= 1;
                self.level.bytes -= queued.frame.size() as u64;
                timeline.apply_position(Side::Output, queued.frame.pts, queued.frame.duration);
                self.refresh_duration(timeline);
                trace!(
                    "{} dequeued {} (gop {}, {} buffers left)",
                    self.name,
                    queued.frame.description(),
                    queued.gop_id,
                    self.level.buffers
                );
            }
            QueueItem::Event(ControlEvent::Segment(segment)) => {
                if self.segment_fast_forwarded {
                    // Already applied when it was queued against an empty
                    // queue.
                    self.segment_fast_forwarded = false;
                    trace!("{} skipping duplicate queued segment", self.name);
                } else {
                    timeline.apply_segment(Side::Output, segment);
                }
            }
            QueueItem::Event(ControlEvent::Gap {
                timestamp,
                duration,
            }) => {
                timeline.apply_position(Side::Output, Some(*timestamp), *duration);
                self.refresh_duration(timeline);
            }
            QueueItem::Event(_) => {}
        }
        Some(item)
    }

    /// Release every queued handle and clear the level. GOP id tracking is
    /// left alone; see [`ItemQueue::reset_gop_tracking`].
    pub(crate) fn clear(&mut self) -> usize {
        let released = self.items.len();
        self.items.clear();
        self.level = Level::default();
        self.segment_fast_forwarded = false;
        released
    }

    /// Return GOP id assignment to its initial state.
    pub(crate) fn reset_gop_tracking(&mut self) {
        self.newest_gop_id = 0;
        self.oldest_gop_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_delta_frame, create_keyframe};
    use prerec_types::Segment;

    fn queue() -> (ItemQueue, Timeline) {
        (ItemQueue::new("test"), Timeline::new())
    }

    #[test]
    fn test_gop_ids_increment_on_keyframes() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_keyframe(0), &mut timeline);
        queue.enqueue_frame(create_delta_frame(1_000), &mut timeline);
        queue.enqueue_frame(create_keyframe(2_000), &mut timeline);
        queue.enqueue_frame(create_delta_frame(3_000), &mut timeline);

        assert_eq!(queue.queued_gop_count(), 2);
        assert_eq!(queue.oldest_gop_id(), 1);
        assert_eq!(queue.level().buffers, 4);
    }

    #[test]
    fn test_level_tracks_bytes_and_duration() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_keyframe(0), &mut timeline);
        queue.enqueue_frame(create_delta_frame(1_000), &mut timeline);

        let level = queue.level();
        assert_eq!(level.buffers, 2);
        assert!(level.bytes > 0);
        assert_eq!(level.duration, Duration::from_secs(2));
    }

    #[test]
    fn test_dequeue_zeroes_duration_when_emptied() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_keyframe(0), &mut timeline);
        assert!(queue.level().duration > Duration::ZERO);

        let item = queue.dequeue(&mut timeline).expect("one queued frame");
        assert!(matches!(item, QueueItem::Frame(_)));
        assert_eq!(queue.level().buffers, 0);
        assert_eq!(queue.level().duration, Duration::ZERO);
        assert_eq!(queue.queued_gop_count(), 0);
    }

    #[test]
    fn test_non_keyframe_head_is_queued_anyway() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_delta_frame(0), &mut timeline);
        assert_eq!(queue.level().buffers, 1);
        // No keyframe seen yet, so the running GOP counter never moved.
        assert_eq!(queue.queued_gop_count(), 1);
        assert_eq!(queue.oldest_gop_id(), 0);
    }

    #[test]
    fn test_segment_fast_path_skips_duplicate_on_dequeue() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_control(
            ControlEvent::Segment(Segment::time(Duration::ZERO)),
            &mut timeline,
        );
        assert!(queue.segment_fast_forwarded);

        queue.enqueue_frame(create_keyframe(0), &mut timeline);

        let item = queue.dequeue(&mut timeline).expect("queued segment");
        assert!(matches!(item, QueueItem::Event(ControlEvent::Segment(_))));
        assert!(!queue.segment_fast_forwarded);
    }

    #[test]
    fn test_segment_queued_behind_frames_takes_slow_path() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_keyframe(0), &mut timeline);
        queue.enqueue_control(
            ControlEvent::Segment(Segment::time(Duration::ZERO)),
            &mut timeline,
        );
        assert!(!queue.segment_fast_forwarded);
    }

    #[test]
    fn test_only_replayable_events_are_queued() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_control(ControlEvent::Eos, &mut timeline);
        queue.enqueue_control(ControlEvent::FlushStart, &mut timeline);
        assert!(queue.is_empty());

        queue.enqueue_control(
            ControlEvent::Gap {
                timestamp: Duration::ZERO,
                duration: Some(Duration::from_secs(1)),
            },
            &mut timeline,
        );
        assert_eq!(queue.len(), 1);
        // Events never count towards the buffer level.
        assert_eq!(queue.level().buffers, 0);
        assert_eq!(queue.level().duration, Duration::ZERO);
    }

    #[test]
    fn test_clear_releases_items_and_level() {
        let (mut queue, mut timeline) = queue();

        queue.enqueue_frame(create_keyframe(0), &mut timeline);
        queue.enqueue_frame(create_delta_frame(1_000), &mut timeline);
        queue.enqueue_control(
            ControlEvent::Segment(Segment::time(Duration::ZERO)),
            &mut timeline,
        );

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.level(), Level::default());
    }

    #[test]
    fn test_gop_ids_are_monotonic() {
        let (mut queue, mut timeline) = queue();
        let mut last = 0;

        for pts in (0..8_000).step_by(1_000) {
            let frame = if pts % 2_000 == 0 {
                create_keyframe(pts as u64)
            } else {
                create_delta_frame(pts as u64)
            };
            queue.enqueue_frame(frame, &mut timeline);
        }
        while let Some(item) = queue.dequeue(&mut timeline) {
            if let QueueItem::Frame(queued) = item {
                assert!(queued.gop_id >= last);
                last = queued.gop_id;
            }
        }
        assert_eq!(last, 4);
    }
}
