//! Navigation graph of panoramas and the viewer loop that drives it.
//!
//! A [`Tour`] owns every panorama in an arena addressed by [`PanoramaId`].
//! Hotspots only store ids, so the graph may contain cycles and a disposed
//! destination simply stops resolving.
//!
//! Nodes talk back to the tour through their event bus. The tour subscribes
//! to each node when it is added and queues what it hears; the queue is
//! drained after every operation that can make nodes emit, so no handler ever
//! runs while a node is borrowed.
//!
//! # Example
//!
//! ```
//! use periscope::{HeadlessBackend, Panorama, PanoramaConfig, Tour, Vec3};
//!
//! let mut tour = Tour::new(HeadlessBackend::new());
//! let lobby = tour.add(Panorama::new(PanoramaConfig::new().animation_duration(100.0)));
//! let garden = tour.add(Panorama::new(PanoramaConfig::new().animation_duration(100.0)));
//! tour.link(lobby, garden, Some(Vec3::new(5000.0, 0.0, 0.0)), None, None).unwrap();
//!
//! tour.set_panorama(lobby).unwrap();
//! tour.update(0.0);
//! tour.update(100.0);
//!
//! tour.activate_hotspot(lobby, 0).unwrap();
//! assert_eq!(tour.current(), Some(garden));
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use log::{debug, info, warn};

use crate::camera::SharedCamera;
use crate::context::Container;
use crate::controls::SharedControls;
use crate::error::TourError;
use crate::events::{Event, EventKind, ViewerRequest};
use crate::hotspot::HotspotImage;
use crate::panorama::{Panorama, PanoramaId, PanoramaNode};
use crate::render::RenderBackend;

type Inbox = Rc<RefCell<VecDeque<(PanoramaId, Event)>>>;

/// Events the tour listens for on every node.
const WATCHED: [EventKind; 3] = [
    EventKind::ViewerHandler,
    EventKind::Ready,
    EventKind::EnterFadeStart,
];

struct Slot {
    node: Box<dyn PanoramaNode>,
    parent: Option<PanoramaId>,
    children: Vec<PanoramaId>,
}

fn slot(slots: &[Option<Slot>], id: PanoramaId) -> Result<&Slot, TourError> {
    slots
        .get(id.0)
        .and_then(Option::as_ref)
        .ok_or(TourError::UnknownPanorama(id))
}

fn slot_mut(slots: &mut [Option<Slot>], id: PanoramaId) -> Result<&mut Slot, TourError> {
    slots
        .get_mut(id.0)
        .and_then(Option::as_mut)
        .ok_or(TourError::UnknownPanorama(id))
}

/// A set of linked panoramas shown one at a time.
pub struct Tour {
    slots: Vec<Option<Slot>>,
    backend: Box<dyn RenderBackend>,
    current: Option<PanoramaId>,
    /// Panoramas to leave once the current one starts fading in.
    leaving: Vec<PanoramaId>,
    /// Panoramas whose `viewer_tick` runs on every update.
    ticking: Vec<PanoramaId>,
    inbox: Inbox,
    container: Option<Container>,
    camera: Option<SharedCamera>,
    controls: Option<SharedControls>,
}

impl fmt::Debug for Tour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tour")
            .field("panoramas", &self.len())
            .field("current", &self.current)
            .field("leaving", &self.leaving)
            .field("ticking", &self.ticking)
            .finish()
    }
}

impl Tour {
    pub fn new(backend: impl RenderBackend + 'static) -> Self {
        Self {
            slots: Vec::new(),
            backend: Box::new(backend),
            current: None,
            leaving: Vec::new(),
            ticking: Vec::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            container: None,
            camera: None,
            controls: None,
        }
    }

    // ========================================================================
    // Graph
    // ========================================================================

    /// Add a top-level panorama.
    pub fn add(&mut self, node: impl PanoramaNode + 'static) -> PanoramaId {
        self.insert(Box::new(node), None)
    }

    /// Add a panorama nested under `parent`. Disposing the parent disposes it
    /// too.
    pub fn add_child(
        &mut self,
        parent: PanoramaId,
        node: impl PanoramaNode + 'static,
    ) -> Result<PanoramaId, TourError> {
        slot(&self.slots, parent)?;
        let id = self.insert(Box::new(node), Some(parent));
        slot_mut(&mut self.slots, parent)?.children.push(id);
        Ok(id)
    }

    fn insert(&mut self, mut node: Box<dyn PanoramaNode>, parent: Option<PanoramaId>) -> PanoramaId {
        let id = PanoramaId(self.slots.len());
        let base = node.panorama_mut();
        base.bind_id(id);
        for kind in WATCHED {
            let inbox = Rc::clone(&self.inbox);
            base.bus_mut()
                .on(kind, move |event| inbox.borrow_mut().push_back((id, event.clone())));
        }

        if let Some(container) = &self.container {
            node.set_container(container.clone());
        }
        if let Some(camera) = &self.camera {
            node.set_camera(Rc::clone(camera));
        }
        if let Some(controls) = &self.controls {
            node.set_controls(Rc::clone(controls));
        }
        node.panorama_mut().allocate_resources(self.backend.as_mut());

        debug!("added {}", id);
        self.slots.push(Some(Slot {
            node,
            parent,
            children: Vec::new(),
        }));
        id
    }

    /// Add a hotspot in `from` leading to `to`.
    ///
    /// Scale and image default to what `to` asks to be linked with. Returns
    /// the hotspot index, or `None` when no position was given.
    pub fn link(
        &mut self,
        from: PanoramaId,
        to: PanoramaId,
        position: Option<Vec3>,
        scale: Option<f32>,
        image: Option<HotspotImage>,
    ) -> Result<Option<usize>, TourError> {
        let target = slot(&self.slots, to)?.node.panorama().link_target(to);
        let source = slot_mut(&mut self.slots, from)?;
        let base = source.node.panorama_mut();
        let index = base.link(target, position, scale, image);
        base.allocate_resources(self.backend.as_mut());
        Ok(index)
    }

    pub fn get(&self, id: PanoramaId) -> Option<&dyn PanoramaNode> {
        slot(&self.slots, id).ok().map(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: PanoramaId) -> Option<&mut (dyn PanoramaNode + 'static)> {
        match slot_mut(&mut self.slots, id) {
            Ok(slot) => Some(slot.node.as_mut()),
            Err(_) => None,
        }
    }

    /// Base state of a panorama.
    pub fn panorama(&self, id: PanoramaId) -> Option<&Panorama> {
        self.get(id).map(|node| node.panorama())
    }

    pub fn contains(&self, id: PanoramaId) -> bool {
        slot(&self.slots, id).is_ok()
    }

    /// Live panoramas, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = PanoramaId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| PanoramaId(index))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: PanoramaId) -> Option<PanoramaId> {
        slot(&self.slots, id).ok().and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: PanoramaId) -> &[PanoramaId] {
        match slot(&self.slots, id) {
            Ok(slot) => &slot.children,
            Err(_) => &[],
        }
    }

    /// Destinations reachable from `id` through hotspots that still resolve.
    pub fn neighbors(&self, id: PanoramaId) -> Vec<PanoramaId> {
        let Ok(slot) = slot(&self.slots, id) else {
            return Vec::new();
        };
        slot.node
            .panorama()
            .link_targets()
            .filter(|target| self.contains(*target))
            .collect()
    }

    // ========================================================================
    // Viewer
    // ========================================================================

    pub fn current(&self) -> Option<PanoramaId> {
        self.current
    }

    /// True while the panorama's `viewer_tick` runs every update.
    pub fn is_ticking(&self, id: PanoramaId) -> bool {
        self.ticking.contains(&id)
    }

    /// Enter `id`. The previous panorama is left once `id` starts fading in.
    pub fn set_panorama(&mut self, id: PanoramaId) -> Result<(), TourError> {
        if self.current == Some(id) {
            return Ok(());
        }
        let target = slot_mut(&mut self.slots, id)?;
        if let Some(previous) = self.current.replace(id)
            && !self.leaving.contains(&previous)
        {
            self.leaving.push(previous);
        }
        self.leaving.retain(|leaving| *leaving != id);
        info!("entering {}", id);
        target.node.enter();
        self.process_requests();
        Ok(())
    }

    /// Activate a hotspot, switching to its destination.
    pub fn activate_hotspot(&mut self, id: PanoramaId, index: usize) -> Result<PanoramaId, TourError> {
        let source = slot_mut(&mut self.slots, id)?;
        let target = source
            .node
            .panorama_mut()
            .activate_hotspot(index)
            .ok_or(TourError::UnknownHotspot { panorama: id, index })?;
        self.process_requests();
        Ok(target)
    }

    /// Advance controls, every panorama and every registered tick by `dt` ms.
    pub fn update(&mut self, dt: f32) {
        if let (Some(controls), Some(camera)) = (&self.controls, &self.camera) {
            let mut controls = controls.borrow_mut();
            if controls.enabled {
                controls.update(dt);
                controls.apply_to(&mut camera.borrow_mut());
            }
        }

        for slot in self.slots.iter_mut().flatten() {
            slot.node.update(dt, self.backend.as_mut());
        }
        self.process_requests();

        for id in self.ticking.clone() {
            if let Ok(slot) = slot_mut(&mut self.slots, id) {
                slot.node.viewer_tick(self.backend.as_mut());
            }
        }
        self.process_requests();
    }

    fn process_requests(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some((from, event)) = next else {
                break;
            };
            match event {
                Event::ViewerHandler(request) => self.handle_request(from, request),
                Event::Ready if self.current == Some(from) => {
                    if let Ok(slot) = slot_mut(&mut self.slots, from) {
                        slot.node.fade_in(None);
                    }
                }
                Event::EnterFadeStart if self.current == Some(from) => {
                    for previous in std::mem::take(&mut self.leaving) {
                        if let Ok(slot) = slot_mut(&mut self.slots, previous) {
                            debug!("leaving {}", previous);
                            slot.node.leave();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_request(&mut self, from: PanoramaId, request: ViewerRequest) {
        debug!("{} asked for {}", from, request.method());
        match request {
            ViewerRequest::SetPanorama(target) => {
                if let Err(err) = self.set_panorama(target) {
                    warn!("hotspot in {} leads nowhere: {}", from, err);
                }
            }
            ViewerRequest::PanoramaDisposed(_) => {
                let id = from;
                if self.current == Some(id) {
                    self.current = None;
                }
                self.leaving.retain(|other| *other != id);
                self.ticking.retain(|other| *other != id);
            }
            ViewerRequest::SetControlCenter => {
                if let Some(controls) = &self.controls {
                    controls.borrow_mut().reset_center();
                }
            }
            ViewerRequest::RotateControlLeft(angle) => {
                if let Some(controls) = &self.controls {
                    controls.borrow_mut().rotate_left(angle);
                }
            }
            ViewerRequest::AddUpdateCallback(id) => {
                if !self.ticking.contains(&id) {
                    self.ticking.push(id);
                }
            }
            ViewerRequest::RemoveUpdateCallback(id) => self.ticking.retain(|other| *other != id),
        }
    }

    /// Dispose a panorama and everything nested under it.
    ///
    /// Children go first; the panorama is then released and detached from
    /// its parent. Disposing twice is an error.
    pub fn dispose(&mut self, id: PanoramaId) -> Result<(), TourError> {
        let children = slot(&self.slots, id)?.children.clone();
        for child in children {
            self.dispose(child)?;
        }

        let mut removed = self.slots[id.0]
            .take()
            .ok_or(TourError::UnknownPanorama(id))?;
        removed.node.dispose(self.backend.as_mut());
        if let Some(parent) = removed.parent
            && let Ok(parent) = slot_mut(&mut self.slots, parent)
        {
            parent.children.retain(|child| *child != id);
        }
        info!("disposed {}", id);
        self.process_requests();
        Ok(())
    }

    /// Dispose every panorama.
    pub fn clear(&mut self) {
        let roots: Vec<PanoramaId> = self
            .ids()
            .filter(|id| self.parent(*id).is_none())
            .collect();
        for id in roots {
            if let Err(err) = self.dispose(id) {
                warn!("{}", err);
            }
        }
    }

    // ========================================================================
    // Context
    // ========================================================================

    /// Share the viewer camera with every panorama, present and future.
    pub fn set_camera(&mut self, camera: SharedCamera) {
        for slot in self.slots.iter_mut().flatten() {
            slot.node.set_camera(Rc::clone(&camera));
        }
        self.camera = Some(camera);
        self.process_requests();
    }

    pub fn set_controls(&mut self, controls: SharedControls) {
        for slot in self.slots.iter_mut().flatten() {
            slot.node.set_controls(Rc::clone(&controls));
        }
        self.controls = Some(controls);
        self.process_requests();
    }

    pub fn set_container(&mut self, container: Container) {
        for slot in self.slots.iter_mut().flatten() {
            slot.node.set_container(container.clone());
        }
        self.container = Some(container);
    }

    pub fn camera(&self) -> Option<&SharedCamera> {
        self.camera.as_ref()
    }

    pub fn controls(&self) -> Option<&SharedControls> {
        self.controls.as_ref()
    }
}
