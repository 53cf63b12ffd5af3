//! Per-node publish/subscribe.
//!
//! Every panorama and hotspot owns an [`EventBus`]. Emission is a plain
//! synchronous call: handlers run immediately, in registration order, and an
//! event never travels to another node unless a handler re-emits it there.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use periscope::{Event, EventBus, EventKind};
//!
//! let mut bus = EventBus::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let log = Rc::clone(&seen);
//! let id = bus.on(EventKind::Ready, move |event| log.borrow_mut().push(event.kind()));
//!
//! bus.emit(Event::Ready);
//! bus.off(id);
//! bus.emit(Event::Ready);
//!
//! assert_eq!(*seen.borrow(), vec![EventKind::Ready]);
//! ```

use std::fmt;

use crate::camera::SharedCamera;
use crate::context::Container;
use crate::controls::SharedControls;
use crate::panorama::{MomentStatus, PanoramaId};

/// Request a node sends up to the viewer.
///
/// Nodes never act on the viewer directly; they emit
/// [`Event::ViewerHandler`] and the viewer interprets the request.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerRequest {
    /// Switch to the given panorama.
    SetPanorama(PanoramaId),
    /// The panorama is being disposed; drop any cached reference. Carries
    /// `None` for a panorama that was never added to a tour.
    PanoramaDisposed(Option<PanoramaId>),
    /// Point the controls back at their initial heading.
    SetControlCenter,
    /// Turn the controls left by the given angle in radians.
    RotateControlLeft(f32),
    /// Call the panorama's per-tick hook on every viewer update.
    AddUpdateCallback(PanoramaId),
    /// Stop calling the panorama's per-tick hook.
    RemoveUpdateCallback(PanoramaId),
}

impl ViewerRequest {
    /// Name of the viewer method this request maps to.
    pub fn method(&self) -> &'static str {
        match self {
            ViewerRequest::SetPanorama(_) => "setPanorama",
            ViewerRequest::PanoramaDisposed(_) => "onPanoramaDispose",
            ViewerRequest::SetControlCenter => "setControlCenter",
            ViewerRequest::RotateControlLeft(_) => "rotateControlLeft",
            ViewerRequest::AddUpdateCallback(_) => "addUpdateCallback",
            ViewerRequest::RemoveUpdateCallback(_) => "removeUpdateCallback",
        }
    }
}

/// Everything a node can announce on its bus.
#[derive(Clone, Debug)]
pub enum Event {
    LoadStart,
    Loaded,
    Load,
    Ready,
    Error(String),
    Progress { loaded: u64, total: u64 },
    Enter,
    EnterStart,
    EnterComplete,
    EnterFadeStart,
    EnterFadeComplete,
    FadeIn,
    FadeOut,
    Leave,
    LeaveStart,
    LeaveComplete,
    InfospotAnimationComplete { visible: bool },
    Container(Container),
    Camera(SharedCamera),
    Controls(SharedControls),
    ViewerHandler(ViewerRequest),
    Moment(MomentStatus),
    /// Forwarded to hotspots when their panorama is entered.
    PanoramaEnter,
    /// Forwarded to hotspots when their panorama is left.
    PanoramaLeave,
    /// A hotspot was activated.
    Click,
    /// A click hit nothing; hotspots should close any open popups.
    Dismiss,
}

impl Event {
    /// Discriminant used for subscription.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::LoadStart => EventKind::LoadStart,
            Event::Loaded => EventKind::Loaded,
            Event::Load => EventKind::Load,
            Event::Ready => EventKind::Ready,
            Event::Error(_) => EventKind::Error,
            Event::Progress { .. } => EventKind::Progress,
            Event::Enter => EventKind::Enter,
            Event::EnterStart => EventKind::EnterStart,
            Event::EnterComplete => EventKind::EnterComplete,
            Event::EnterFadeStart => EventKind::EnterFadeStart,
            Event::EnterFadeComplete => EventKind::EnterFadeComplete,
            Event::FadeIn => EventKind::FadeIn,
            Event::FadeOut => EventKind::FadeOut,
            Event::Leave => EventKind::Leave,
            Event::LeaveStart => EventKind::LeaveStart,
            Event::LeaveComplete => EventKind::LeaveComplete,
            Event::InfospotAnimationComplete { .. } => EventKind::InfospotAnimationComplete,
            Event::Container(_) => EventKind::Container,
            Event::Camera(_) => EventKind::Camera,
            Event::Controls(_) => EventKind::Controls,
            Event::ViewerHandler(_) => EventKind::ViewerHandler,
            Event::Moment(status) => EventKind::Moment(*status),
            Event::PanoramaEnter => EventKind::PanoramaEnter,
            Event::PanoramaLeave => EventKind::PanoramaLeave,
            Event::Click => EventKind::Click,
            Event::Dismiss => EventKind::Dismiss,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Payload-free event discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    LoadStart,
    Loaded,
    Load,
    Ready,
    Error,
    Progress,
    Enter,
    EnterStart,
    EnterComplete,
    EnterFadeStart,
    EnterFadeComplete,
    FadeIn,
    FadeOut,
    Leave,
    LeaveStart,
    LeaveComplete,
    InfospotAnimationComplete,
    Container,
    Camera,
    Controls,
    ViewerHandler,
    Moment(MomentStatus),
    PanoramaEnter,
    PanoramaLeave,
    Click,
    Dismiss,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::LoadStart => "load-start",
            EventKind::Loaded => "loaded",
            EventKind::Load => "load",
            EventKind::Ready => "ready",
            EventKind::Error => "error",
            EventKind::Progress => "progress",
            EventKind::Enter => "enter",
            EventKind::EnterStart => "enter-start",
            EventKind::EnterComplete => "enter-complete",
            EventKind::EnterFadeStart => "enter-fade-start",
            EventKind::EnterFadeComplete => "enter-fade-complete",
            EventKind::FadeIn => "fade-in",
            EventKind::FadeOut => "fade-out",
            EventKind::Leave => "leave",
            EventKind::LeaveStart => "leave-start",
            EventKind::LeaveComplete => "leave-complete",
            EventKind::InfospotAnimationComplete => "infospot-animation-complete",
            EventKind::Container => "panolens-container",
            EventKind::Camera => "panolens-camera",
            EventKind::Controls => "panolens-controls",
            EventKind::ViewerHandler => "panolens-viewer-handler",
            EventKind::Moment(status) => status.event_name(),
            EventKind::PanoramaEnter => "panorama-enter",
            EventKind::PanoramaLeave => "panorama-leave",
            EventKind::Click => "click",
            EventKind::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    /// `None` matches every event.
    kind: Option<EventKind>,
    handler: Box<dyn FnMut(&Event)>,
}

/// Synchronous, node-local publish/subscribe.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of `kind`.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> ListenerId
    where
        F: FnMut(&Event) + 'static,
    {
        self.subscribe(Some(kind), Box::new(handler))
    }

    /// Call `handler` for every event emitted on this bus.
    pub fn on_any<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&Event) + 'static,
    {
        self.subscribe(None, Box::new(handler))
    }

    fn subscribe(&mut self, kind: Option<EventKind>, handler: Box<dyn FnMut(&Event)>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener { id, kind, handler });
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    /// Invoke every matching handler, in registration order.
    pub fn emit(&mut self, event: Event) {
        let kind = event.kind();
        for listener in &mut self.listeners {
            if listener.kind.is_none_or(|k| k == kind) {
                (listener.handler)(&event);
            }
        }
    }

    /// Number of handlers that would receive an event of `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|listener| listener.kind.is_none_or(|k| k == kind))
            .count()
    }

    /// Drop every handler.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(bus: &mut EventBus) -> Rc<RefCell<Vec<&'static str>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        bus.on_any(move |event| log.borrow_mut().push(event.name()));
        seen
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let order = Rc::clone(&order);
            bus.on(EventKind::Enter, move |_| order.borrow_mut().push(tag));
        }
        bus.emit(Event::Enter);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn handlers_only_see_their_kind() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        bus.on(EventKind::Leave, move |_| *counter.borrow_mut() += 1);

        bus.emit(Event::Enter);
        bus.emit(Event::Leave);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn off_removes_only_that_handler() {
        let mut bus = EventBus::new();
        let seen = recorder(&mut bus);
        let id = bus.on(EventKind::Ready, |_| {});
        assert_eq!(bus.listener_count(EventKind::Ready), 2);

        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(Event::Ready);
        assert_eq!(*seen.borrow(), vec!["ready"]);
    }

    #[test]
    fn moment_events_use_status_names() {
        assert_eq!(
            Event::Moment(MomentStatus::FirstFrameDecoded).name(),
            "panomoments.first_frame_decoded"
        );
        assert_eq!(
            ViewerRequest::RotateControlLeft(1.0).method(),
            "rotateControlLeft"
        );
    }
}
