//! # PreRecordLoop
//!
//! The mode/event state machine tying the queue, timeline and pruner
//! together behind a single lock.
//!
//! ## Operation
//!
//! The loop starts in BUFFERING mode: incoming frames are held in the
//! GOP-tagged queue and old GOPs are pruned whenever the buffered duration
//! reaches the configured budget. A custom downstream event whose name
//! matches the configured flush trigger drains the whole window downstream
//! in FIFO order and switches to PASS_THROUGH, where frames bypass the
//! queue entirely. The fixed `"prerecord-arm"` upstream event discards any
//! residue and returns to BUFFERING for the next capture cycle.
//!
//! ## Locking
//!
//! One mutex guards the queue, the level, both timeline sides, the mode and
//! the counters. Mode decisions are made under the lock immediately before
//! it is released, which makes duplicate or concurrent trigger signals
//! race-free no-ops. Calls into the output collaborator always happen with
//! the lock released, so a slow or reentrant downstream never blocks other
//! threads. The `item_add`/`item_del` condition variables are signaled on
//! every enqueue/dequeue for blocking producer/consumer variants; no
//! current path waits on them.

use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use prerec_types::{ControlEvent, Frame};
use tracing::{debug, info, trace};

use crate::config::{EosFlushPolicy, PreRecordConfig, REARM_TRIGGER};
use crate::error::FlowError;
use crate::pruner;
use crate::queue::{ItemQueue, QueueItem};
use crate::sink::OutputSink;
use crate::stats::{Counters, StatsSnapshot};
use crate::timeline::Timeline;

/// Operating mode of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Incoming frames are held in the bounded queue.
    Buffering,
    /// Incoming frames are forwarded straight downstream.
    PassThrough,
}

/// State guarded by the loop's single lock.
#[derive(Debug)]
struct Shared {
    queue: ItemQueue,
    timeline: Timeline,
    mode: Mode,
    config: PreRecordConfig,
    counters: Counters,
    /// Between flush-start and flush-stop; frame submissions fail fast.
    flushing: bool,
    /// End of stream observed; frame submissions are refused terminally.
    eos: bool,
}

/// GOP-aware bounded pre-record buffer with trigger-driven release.
pub struct PreRecordLoop<S> {
    name: String,
    sink: S,
    shared: Mutex<Shared>,
    /// Signaled on every successful enqueue.
    item_add: Condvar,
    /// Signaled on every dequeue or queue clear.
    item_del: Condvar,
}

impl<S: OutputSink> PreRecordLoop<S> {
    pub fn new(name: impl Into<String>, sink: S) -> Self {
        Self::with_config(name, sink, PreRecordConfig::default())
    }

    pub fn with_config(name: impl Into<String>, sink: S, config: PreRecordConfig) -> Self {
        let name = name.into();
        Self {
            shared: Mutex::new(Shared {
                queue: ItemQueue::new(name.clone()),
                timeline: Timeline::new(),
                mode: Mode::Buffering,
                config: config.clamped(),
                counters: Counters::default(),
                flushing: false,
                eos: false,
            }),
            item_add: Condvar::new(),
            item_del: Condvar::new(),
            name,
            sink,
        }
    }

    /// Borrow the downstream collaborator.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn current_mode(&self) -> Mode {
        self.shared.lock().mode
    }

    /// Duration currently held in the queue.
    pub fn buffered_duration(&self) -> Duration {
        self.shared.lock().queue.level().duration
    }

    /// Read-only snapshot of the counters and current occupancy.
    pub fn stats(&self) -> StatsSnapshot {
        let shared = self.shared.lock();
        StatsSnapshot {
            dropped_gops: shared.counters.dropped_gops,
            dropped_buffers: shared.counters.dropped_buffers,
            dropped_events: shared.counters.dropped_events,
            queued_gops: shared.queue.queued_gop_count(),
            queued_buffers: shared.queue.level().buffers as u64,
            flush_count: shared.counters.flush_count,
            rearm_count: shared.counters.rearm_count,
        }
    }

    /// Replace the configuration. Values are clamped, never rejected.
    pub fn set_config(&self, config: PreRecordConfig) {
        self.shared.lock().config = config.clamped();
    }

    /// Update the time budget from whole seconds; negative values clamp to
    /// 0 (unlimited).
    pub fn set_max_duration_secs(&self, secs: i64) {
        self.shared.lock().config.max_duration = Duration::from_secs(secs.max(0) as u64);
    }

    pub fn set_eos_policy(&self, policy: EosFlushPolicy) {
        self.shared.lock().config.eos_policy = policy;
    }

    /// Submit a frame from upstream.
    ///
    /// While buffering the frame is queued (and old GOPs pruned if the
    /// budget is exceeded); in pass-through it goes straight downstream.
    /// The frame's handle is released on refusal.
    pub fn push_frame(&self, frame: Frame) -> Result<(), FlowError> {
        let mut shared = self.shared.lock();
        if shared.flushing {
            debug!("{} refusing frame while flushing", self.name);
            return Err(FlowError::Flushing);
        }
        if shared.eos {
            debug!("{} refusing frame after end of stream", self.name);
            return Err(FlowError::Eos);
        }

        trace!(
            "{} received {} of {} bytes",
            self.name,
            frame.description(),
            frame.size()
        );

        match shared.mode {
            Mode::PassThrough => {
                drop(shared);
                self.sink.push_frame(frame)
            }
            Mode::Buffering => {
                let s = &mut *shared;
                s.queue.enqueue_frame(frame, &mut s.timeline);
                self.item_add.notify_one();
                pruner::prune(
                    &self.name,
                    &mut s.queue,
                    &mut s.timeline,
                    &mut s.counters,
                    s.config.max_duration,
                );
                Ok(())
            }
        }
    }

    /// Submit a control event.
    ///
    /// Flush and rearm triggers are consumed here; everything else is
    /// forwarded downstream, with segment and gap events additionally
    /// queued for replay while buffering.
    pub fn push_event(&self, event: ControlEvent) -> bool {
        trace!("{} received {} event", self.name, event.type_name());
        match event {
            ControlEvent::CustomDownstream { name } => {
                let shared = self.shared.lock();
                if name == shared.config.flush_trigger {
                    self.handle_flush_trigger(shared);
                    true
                } else {
                    drop(shared);
                    self.sink.push_event(ControlEvent::CustomDownstream { name })
                }
            }
            ControlEvent::CustomUpstream { name } => {
                if name == REARM_TRIGGER {
                    self.handle_rearm();
                    true
                } else {
                    self.sink.push_event(ControlEvent::CustomUpstream { name })
                }
            }
            ControlEvent::Eos => self.handle_eos(),
            ControlEvent::FlushStart => self.handle_flush_start(),
            ControlEvent::FlushStop { reset_time } => self.handle_flush_stop(reset_time),
            ControlEvent::Segment(_) | ControlEvent::Gap { .. } => {
                {
                    let mut shared = self.shared.lock();
                    // Queue for replay only while buffering; queueing in
                    // pass-through would replay the event twice after a
                    // later rearm-then-flush cycle.
                    if shared.mode == Mode::Buffering {
                        let s = &mut *shared;
                        s.queue.enqueue_control(event.clone(), &mut s.timeline);
                        self.item_add.notify_one();
                    }
                }
                // Forward immediately so an already-connected consumer
                // keeps its stream state current.
                self.sink.push_event(event)
            }
            other => self.sink.push_event(other),
        }
    }

    /// Pop queued items one at a time and push each downstream with the
    /// lock released.
    fn drain<'a>(&'a self, mut shared: MutexGuard<'a, Shared>) -> MutexGuard<'a, Shared> {
        loop {
            let s = &mut *shared;
            let Some(item) = s.queue.dequeue(&mut s.timeline) else {
                return shared;
            };
            self.item_del.notify_one();
            drop(shared);
            match item {
                QueueItem::Frame(queued) => {
                    if let Err(err) = self.sink.push_frame(queued.frame) {
                        debug!("{} downstream refused drained frame: {}", self.name, err);
                    }
                }
                QueueItem::Event(event) => {
                    self.sink.push_event(event);
                }
            }
            shared = self.shared.lock();
        }
    }

    fn handle_flush_trigger(&self, mut shared: MutexGuard<'_, Shared>) {
        if shared.mode != Mode::Buffering {
            // Duplicate or late trigger; uncounted no-op.
            debug!("{} flush trigger ignored in pass-through", self.name);
            return;
        }

        info!(
            "{} flush trigger accepted, draining {} queued items",
            self.name,
            shared.queue.len()
        );
        // Switch before the lock is first released so concurrent duplicates
        // observe pass-through and no-op.
        shared.mode = Mode::PassThrough;
        shared.counters.flush_count += 1;
        let _shared = self.drain(shared);
    }

    fn handle_rearm(&self) {
        let mut shared = self.shared.lock();
        if shared.mode != Mode::PassThrough {
            // Uncounted no-op while already buffering.
            debug!("{} rearm ignored while buffering", self.name);
            return;
        }

        let released = shared.queue.clear();
        shared.queue.reset_gop_tracking();
        shared.timeline.reset();
        shared.counters.rearm_count += 1;
        shared.mode = Mode::Buffering;
        self.item_del.notify_all();
        info!(
            "{} re-armed, buffering again ({} residual items released)",
            self.name, released
        );
    }

    fn handle_eos(&self) -> bool {
        let mut shared = self.shared.lock();
        let drain = match (shared.config.eos_policy, shared.mode) {
            (EosFlushPolicy::Always, _) => true,
            (EosFlushPolicy::Never, _) => false,
            (EosFlushPolicy::Auto, Mode::Buffering) => false,
            (EosFlushPolicy::Auto, Mode::PassThrough) => true,
        };

        debug!(
            "{} end of stream: {} {} queued items",
            self.name,
            if drain { "draining" } else { "discarding" },
            shared.queue.len()
        );

        if drain {
            shared = self.drain(shared);
        } else {
            let released = shared.queue.clear();
            if released > 0 {
                self.item_del.notify_all();
                debug!("{} released {} items on end of stream", self.name, released);
            }
        }
        shared.queue.reset_gop_tracking();
        shared.eos = true;
        drop(shared);

        self.sink.push_event(ControlEvent::Eos)
    }

    fn handle_flush_start(&self) -> bool {
        {
            let mut shared = self.shared.lock();
            let released = shared.queue.clear();
            shared.queue.reset_gop_tracking();
            shared.flushing = true;
            self.item_del.notify_all();
            debug!(
                "{} flush start, released {} queued items",
                self.name, released
            );
        }
        self.sink.push_event(ControlEvent::FlushStart)
    }

    fn handle_flush_stop(&self, reset_time: bool) -> bool {
        {
            let mut shared = self.shared.lock();
            shared.flushing = false;
            // A completed seek restarts the stream.
            shared.eos = false;
            if reset_time {
                shared.timeline.reset();
            }
            debug!("{} flush stop (reset_time={})", self.name, reset_time);
        }
        self.sink.push_event(ControlEvent::FlushStop { reset_time })
    }
}
