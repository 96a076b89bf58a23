use thiserror::Error;

/// Flow status returned to the immediate caller of a frame submission.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// The loop sits between flush-start and flush-stop and accepts no
    /// frames; the refused frame's handle has been released.
    #[error("loop is flushing, not accepting frames")]
    Flushing,

    /// End of stream was observed; further submissions are refused
    /// terminally.
    #[error("end of stream reached")]
    Eos,

    /// The downstream collaborator could not consume the item.
    #[error("downstream refused delivery")]
    Downstream,
}
