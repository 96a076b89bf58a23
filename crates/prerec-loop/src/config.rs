use std::time::Duration;

/// Name of the custom downstream event that triggers a flush, unless
/// overridden in the configuration.
pub const DEFAULT_FLUSH_TRIGGER: &str = "prerecord-flush";

/// Name of the custom upstream event that re-arms buffering after a flush.
pub const REARM_TRIGGER: &str = "prerecord-arm";

/// Default time budget for the pre-record window.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(10);

/// What to do with still-buffered items when end of stream arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EosFlushPolicy {
    /// Drain in pass-through mode, discard while still buffering.
    #[default]
    Auto,
    /// Always drain the queue downstream.
    Always,
    /// Always discard the queue.
    Never,
}

/// Configuration for the pre-record loop.
///
/// Out-of-range values are clamped, never rejected: the time budget is
/// specified in whole seconds and negative inputs clamp to zero
/// (unlimited).
#[derive(Debug, Clone)]
pub struct PreRecordConfig {
    /// Time budget for the buffered window; `Duration::ZERO` means
    /// unlimited.
    pub max_duration: Duration,
    /// End-of-stream drain policy.
    pub eos_policy: EosFlushPolicy,
    /// Name of the custom downstream event treated as the flush trigger.
    pub flush_trigger: String,
}

impl Default for PreRecordConfig {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_MAX_DURATION,
            eos_policy: EosFlushPolicy::default(),
            flush_trigger: DEFAULT_FLUSH_TRIGGER.to_string(),
        }
    }
}

impl PreRecordConfig {
    /// Round the time budget down to the whole-second granularity it is
    /// specified in.
    pub fn clamped(mut self) -> Self {
        self.max_duration = Duration::from_secs(self.max_duration.as_secs());
        self
    }

    /// Set the time budget from whole seconds; negative values clamp to 0
    /// (unlimited).
    pub fn max_duration_secs(mut self, secs: i64) -> Self {
        self.max_duration = Duration::from_secs(secs.max(0) as u64);
        self
    }

    pub fn eos_policy(mut self, policy: EosFlushPolicy) -> Self {
        self.eos_policy = policy;
        self
    }

    pub fn flush_trigger(mut self, name: impl Into<String>) -> Self {
        self.flush_trigger = name.into();
        self
    }
}
