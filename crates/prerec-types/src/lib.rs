pub mod event;
pub mod frame;
pub mod segment;

pub use event::ControlEvent;
pub use frame::Frame;
pub use segment::{Segment, SegmentFormat};
