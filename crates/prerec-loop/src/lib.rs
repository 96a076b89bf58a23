//! GOP-aware pre-record buffering loop
//!
//! This crate buffers a continuous stream of encoded video frames in a
//! bounded, time-windowed holding area that never splits a group of
//! pictures, so that a capture trigger can retroactively retrieve the most
//! recent pre-event footage.
//!
//! ## Component overview
//!
//! - `timeline`: dual-sided (input/output) segment and position tracking
//!   that derives the currently buffered duration
//! - `queue`: the ordered collection of GOP-tagged frames and replayable
//!   control events, with byte/buffer/duration level accounting
//! - `pruner`: whole-GOP eviction once the time budget is reached, with a
//!   two-GOP retention floor
//! - `element`: the BUFFERING / PASS_THROUGH state machine driving the
//!   other components under a single lock
//! - `stats`: passive counters exposed as a read-only snapshot
//!
//! ## Operation
//!
//! While buffering, frames are queued and old GOPs are pruned to keep the
//! window within the configured budget; a named custom downstream event
//! (default `"prerecord-flush"`) drains the whole window downstream in FIFO
//! order and switches to pass-through. A `"prerecord-arm"` upstream event
//! discards any residue and returns to buffering.

mod config;
mod element;
mod error;
mod pruner;
mod queue;
mod sink;
mod stats;
mod timeline;

#[cfg(test)]
pub mod test_utils;

pub use config::{
    DEFAULT_FLUSH_TRIGGER, DEFAULT_MAX_DURATION, EosFlushPolicy, PreRecordConfig, REARM_TRIGGER,
};
pub use element::{Mode, PreRecordLoop};
pub use error::FlowError;
pub use sink::OutputSink;
pub use stats::StatsSnapshot;
