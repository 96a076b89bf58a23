/// Drop and trigger counters, mutated only under the loop's lock.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    /// Whole-GOP pruning operations.
    pub dropped_gops: u64,
    /// Individual frames dropped inside GOP pruning.
    pub dropped_buffers: u64,
    /// Control events discarded during pruning.
    pub dropped_events: u64,
    /// Accepted flush triggers.
    pub flush_count: u64,
    /// Accepted rearm triggers.
    pub rearm_count: u64,
}

/// Read-only view of the loop's counters plus its current occupancy.
///
/// `queued_gops` and `queued_buffers` are computed from the queue at
/// snapshot time, under the same lock as the counters, so they can never
/// go stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub dropped_gops: u64,
    pub dropped_buffers: u64,
    pub dropped_events: u64,
    pub queued_gops: u64,
    pub queued_buffers: u64,
    pub flush_count: u64,
    pub rearm_count: u64,
}
