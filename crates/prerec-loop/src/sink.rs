use prerec_types::{ControlEvent, Frame};

use crate::error::FlowError;

/// Downstream collaborator receiving frames and events from the loop.
///
/// Every call is made with the loop's internal lock released, so an
/// implementation may reenter the loop (for example by raising an event
/// back at it) without deadlocking, and slow delivery never blocks other
/// threads. Implementations handle their own synchronization.
pub trait OutputSink: Send + Sync {
    /// Push a frame downstream. Ownership of the payload handle moves to
    /// the sink, which must consume or release it exactly once.
    fn push_frame(&self, frame: Frame) -> Result<(), FlowError>;

    /// Push a control event downstream. Returns whether the event was
    /// accepted.
    fn push_event(&self, event: ControlEvent) -> bool;
}
