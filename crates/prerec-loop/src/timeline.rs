//! Dual-sided position tracking.
//!
//! The loop needs to know how much stream time currently sits in its queue.
//! That is the distance between two independently tracked positions: the
//! input side (what upstream has handed us) and the output side (what we
//! have released downstream). During the pure fill phase nothing has been
//! released yet, so the distance is measured from the first input timestamp
//! instead.

use std::time::Duration;

use prerec_types::Segment;
use tracing::{debug, trace};

/// Which end of the loop a timeline update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Input,
    Output,
}

/// Normalized time segment for one side plus its cached running time.
#[derive(Debug, Clone, Default)]
struct SideState {
    start: Duration,
    #[allow(dead_code)]
    stop: Option<Duration>,
    position: Option<Duration>,
    /// Running time of `position`, in signed nanoseconds.
    running: Option<i64>,
    /// Set when `running` must be recomputed from `position`.
    dirty: bool,
}

impl SideState {
    fn apply_segment(&mut self, segment: &Segment) {
        if segment.is_time() {
            self.start = segment.start;
            self.stop = segment.stop;
            self.position = segment.position;
        } else {
            // Duration accounting requires a time base: treat a non-time
            // segment as closed, starting at 0 with an unknown stop.
            self.start = Duration::ZERO;
            self.stop = None;
            self.position = None;
        }
        self.dirty = true;
    }

    /// Map a stream timestamp through the segment start into running time.
    fn to_running_time(&self, ts: Duration) -> i64 {
        ts.as_nanos() as i64 - self.start.as_nanos() as i64
    }

    fn refresh(&mut self) {
        if self.dirty {
            self.running = self.position.map(|p| self.to_running_time(p));
            self.dirty = false;
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Tracks both stream positions and derives the buffered duration between
/// them.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    input: SideState,
    output: SideState,
    /// Running time of the first item seen on the input side.
    input_baseline: Option<i64>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Input => &mut self.input,
            Side::Output => &mut self.output,
        }
    }

    /// Install a new segment on one side.
    pub(crate) fn apply_segment(&mut self, side: Side, segment: &Segment) {
        self.side_mut(side).apply_segment(segment);
        trace!(?side, "configured segment");
    }

    /// Advance one side's position past an item.
    ///
    /// A `None` timestamp assumes the position did not change compared to
    /// the previous item and leaves everything untouched. The first valid
    /// input-side timestamp becomes the baseline the fill phase measures
    /// against.
    pub(crate) fn apply_position(
        &mut self,
        side: Side,
        pts: Option<Duration>,
        duration: Option<Duration>,
    ) {
        let Some(pts) = pts else { return };

        if side == Side::Input && self.input_baseline.is_none() {
            let baseline = self.input.to_running_time(pts);
            debug!(baseline_ns = baseline, "input start time recorded");
            self.input_baseline = Some(baseline);
        }

        let end = match duration {
            Some(d) => pts + d,
            None => pts,
        };
        let state = self.side_mut(side);
        state.position = Some(end);
        state.dirty = true;
        trace!(?side, position = ?end, "position updated");
    }

    /// Duration currently held between the input and output positions.
    ///
    /// Running times are recomputed lazily for the sides marked dirty. The
    /// input/output difference wins when both are known; with no output
    /// position yet, the distance from the input baseline is used; anything
    /// else reads as zero.
    pub(crate) fn buffered_duration(&mut self) -> Duration {
        self.input.refresh();
        self.output.refresh();

        let Some(input) = self.input.running else {
            return Duration::ZERO;
        };

        let nanos = match self.output.running {
            Some(output) if input >= output => input - output,
            Some(_) => 0,
            None => match self.input_baseline {
                Some(baseline) if input >= baseline => input - baseline,
                _ => 0,
            },
        };
        Duration::from_nanos(nanos as u64)
    }

    /// Forget both sides, including the input baseline.
    pub(crate) fn reset(&mut self) {
        self.input.reset();
        self.output.reset();
        self.input_baseline = None;
    }
}
