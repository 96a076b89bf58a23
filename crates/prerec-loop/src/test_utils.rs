//! Shared helpers for the crate's tests.

use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use prerec_types::{ControlEvent, Frame};

use crate::error::FlowError;
use crate::sink::OutputSink;

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A frame with a 1 s duration at `pts_ms`, carrying a small dummy payload.
pub fn create_frame(pts_ms: u64, keyframe: bool) -> Frame {
    Frame::new(
        Bytes::from_static(&[0u8; 16]),
        Some(Duration::from_millis(pts_ms)),
        Some(Duration::from_secs(1)),
        keyframe,
    )
}

pub fn create_keyframe(pts_ms: u64) -> Frame {
    create_frame(pts_ms, true)
}

pub fn create_delta_frame(pts_ms: u64) -> Frame {
    create_frame(pts_ms, false)
}

/// Anything observed by a [`CollectingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkItem {
    Frame(Frame),
    Event(ControlEvent),
}

/// Output sink that records everything pushed into it.
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Mutex<Vec<SinkItem>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<SinkItem> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.items
            .lock()
            .iter()
            .filter_map(|item| match item {
                SinkItem::Frame(frame) => Some(frame.clone()),
                SinkItem::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<ControlEvent> {
        self.items
            .lock()
            .iter()
            .filter_map(|item| match item {
                SinkItem::Event(event) => Some(event.clone()),
                SinkItem::Frame(_) => None,
            })
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.frames().len()
    }
}

impl OutputSink for CollectingSink {
    fn push_frame(&self, frame: Frame) -> Result<(), FlowError> {
        self.items.lock().push(SinkItem::Frame(frame));
        Ok(())
    }

    fn push_event(&self, event: ControlEvent) -> bool {
        self.items.lock().push(SinkItem::Event(event));
        true
    }
}
