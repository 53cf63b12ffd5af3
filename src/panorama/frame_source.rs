//! Capability seam for the external synchronized-video frame source.
//!
//! A [`FrameSourceConnector`] opens a source for a moment identifier. The
//! source reports progress by pushing [`FrameSourceEvent`]s into the
//! [`FrameEvents`] queue it was handed; the owning panorama drains that queue
//! on its next tick, so callbacks never re-enter the panorama.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Metadata delivered with decoded frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameData {
    pub frame_count: u32,
    /// Whether frames advance clockwise as the camera turns.
    pub clockwise: bool,
    /// Frame the moment should initially face, in degrees.
    pub start_frame: f32,
}

/// Notification from a frame source.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameSourceEvent {
    /// A frame finished decoding. Sent for every frame, not just the first.
    FrameDecoded(FrameData),
    /// Enough frames are decoded to scrub interactively.
    Ready,
    /// Every frame is decoded.
    Loaded,
}

/// Queue a frame source reports into.
#[derive(Clone, Debug, Default)]
pub struct FrameEvents {
    queue: Rc<RefCell<VecDeque<FrameSourceEvent>>>,
}

impl FrameEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, data: FrameData) {
        self.push(FrameSourceEvent::FrameDecoded(data));
    }

    pub fn ready(&self) {
        self.push(FrameSourceEvent::Ready);
    }

    pub fn loaded(&self) {
        self.push(FrameSourceEvent::Loaded);
    }

    fn push(&self, event: FrameSourceEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    /// Events not yet consumed by the panorama.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn pop(&self) -> Option<FrameSourceEvent> {
        self.queue.borrow_mut().pop_front()
    }
}

/// A live connection to a synchronized-video moment.
pub trait FrameSource {
    /// Decode and present the frame at `frame_index`.
    fn render(&mut self, frame_index: u32);

    fn frame_count(&self) -> u32;

    /// True once the source's texture holds a presentable frame.
    fn texture_ready(&self) -> bool;

    fn dispose(&mut self);
}

/// Opens frame sources on demand.
pub trait FrameSourceConnector {
    fn connect(&mut self, identifier: &str, events: FrameEvents) -> Box<dyn FrameSource>;
}
