//! Whole-GOP eviction.
//!
//! Once the buffered duration reaches the configured budget, the oldest
//! GOPs are discarded off the head of the queue, one whole GOP at a time.
//! A GOP is never split, and at least two GOPs stay resident, so a single
//! GOP whose own span exceeds the budget is simply retained until newer
//! GOPs arrive behind it.

use std::time::Duration;

use tracing::{debug, warn};

use crate::queue::{ItemQueue, QueueItem};
use crate::stats::Counters;
use crate::timeline::Timeline;

/// Items released by a single whole-GOP eviction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictOutcome {
    pub frames_dropped: usize,
    pub events_dropped: usize,
}

/// True once the time budget is reached. A zero budget means unlimited.
pub(crate) fn is_over_budget(queue: &ItemQueue, max_duration: Duration) -> bool {
    !max_duration.is_zero() && queue.level().duration >= max_duration
}

/// Eviction may only run while more than the two-GOP floor is queued.
pub(crate) fn should_evict(queue: &ItemQueue, max_duration: Duration) -> bool {
    is_over_budget(queue, max_duration) && queue.queued_gop_count() > 2
}

/// Drop the oldest whole GOP off the head of the queue.
///
/// Seek phase: discard leading control events, plus any frame that cannot
/// be a GOP head (non-keyframe, or a GOP id that does not match the
/// recorded oldest) -- such frames signal an upstream contract violation
/// and are force-dropped to recover. Evict phase: discard every item of
/// the oldest GOP until a frame of a newer GOP becomes the head; that
/// frame's id becomes the new oldest.
///
/// Dropped items pass through [`ItemQueue::dequeue`], so level and
/// output-side timeline accounting stay correct and every handle is
/// released exactly once.
pub(crate) fn evict_oldest_gop(
    name: &str,
    queue: &mut ItemQueue,
    timeline: &mut Timeline,
) -> EvictOutcome {
    let mut outcome = EvictOutcome::default();
    let target = queue.oldest_gop_id();

    // Seek to a valid GOP head.
    loop {
        match queue.peek() {
            None => {
                warn!("{name} queue emptied while seeking a GOP head");
                return outcome;
            }
            Some(QueueItem::Event(_)) => {
                drop(queue.dequeue(timeline));
                outcome.events_dropped += 1;
            }
            Some(QueueItem::Frame(queued)) => {
                if queued.frame.keyframe && queued.gop_id == target {
                    break;
                }
                if !queued.frame.keyframe {
                    warn!(
                        "{name} expected a keyframe at the head of gop {}, force-dropping",
                        queued.gop_id
                    );
                } else {
                    warn!(
                        "{name} head frame belongs to gop {} instead of {}, force-dropping",
                        queued.gop_id, target
                    );
                }
                drop(queue.dequeue(timeline));
                outcome.frames_dropped += 1;
            }
        }
    }

    // Discard everything belonging to the target GOP.
    loop {
        match queue.peek() {
            None => break,
            Some(QueueItem::Event(_)) => {
                drop(queue.dequeue(timeline));
                outcome.events_dropped += 1;
            }
            Some(QueueItem::Frame(queued)) if queued.gop_id == target => {
                drop(queue.dequeue(timeline));
                outcome.frames_dropped += 1;
            }
            Some(QueueItem::Frame(queued)) => {
                let next_gop = queued.gop_id;
                if !queued.frame.keyframe {
                    warn!("{name} gop {next_gop} does not start with a keyframe");
                }
                queue.set_oldest_gop_id(next_gop);
                break;
            }
        }
    }

    debug!(
        "{name} dropped gop {target} ({} frames, {} events), {:?} still buffered",
        outcome.frames_dropped,
        outcome.events_dropped,
        queue.level().duration
    );
    outcome
}

/// Evict whole GOPs while the budget is exceeded, stopping at the two-GOP
/// floor or as soon as an eviction stops making progress.
pub(crate) fn prune(
    name: &str,
    queue: &mut ItemQueue,
    timeline: &mut Timeline,
    counters: &mut Counters,
    max_duration: Duration,
) {
    while should_evict(queue, max_duration) {
        let before = queue.queued_gop_count();
        let outcome = evict_oldest_gop(name, queue, timeline);

        counters.dropped_gops += 1;
        counters.dropped_buffers += outcome.frames_dropped as u64;
        counters.dropped_events += outcome.events_dropped as u64;

        let after = queue.queued_gop_count();
        if after >= before {
            warn!("{name} eviction made no progress ({before} -> {after} gops), stopping");
            break;
        }
        if after == 2 {
            break;
        }
    }
}
