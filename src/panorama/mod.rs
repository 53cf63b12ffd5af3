//! Panorama nodes and their lifecycle.
//!
//! A panorama is one 360° environment plus the hotspots leading out of it.
//! Its lifecycle is driven from outside:
//!
//! - `load` once (immediately, or when the first enter needs it)
//! - `enter` / `leave` any number of times, each starting a transition tween
//! - `fade_in` / `fade_out` to animate opacity
//! - `update(dt)` every frame, which is the only place tweens make progress
//! - `dispose` exactly once
//!
//! [`PanoramaNode`] is the contract the viewer programs against. [`Panorama`]
//! implements it directly; [`MomentPanorama`] wraps a `Panorama` and overrides
//! loading, ticking and the enter/leave hooks to follow an external video
//! frame source.
//!
//! # Example
//!
//! ```
//! use periscope::{Event, EventKind, Panorama, PanoramaConfig, PanoramaNode, HeadlessBackend};
//!
//! let mut backend = HeadlessBackend::new();
//! let mut pano = Panorama::new(PanoramaConfig::new().animation_duration(200.0));
//! pano.bus_mut().on(EventKind::Ready, |_| println!("ready"));
//!
//! pano.enter();
//! pano.update(0.0, &mut backend); // enter-start, then load -> ready
//! assert!(pano.is_loaded());
//!
//! pano.fade_in(None);
//! pano.update(0.0, &mut backend); // enter-fade-start
//! pano.update(200.0, &mut backend); // enter-fade-complete
//! assert_eq!(pano.opacity(), 1.0);
//! ```

mod base;
mod frame_source;
mod moment;

use std::fmt;

pub use base::{LinkTarget, LoadState, Panorama, PanoramaConfig, TickOutcome};
pub use frame_source::{FrameData, FrameEvents, FrameSource, FrameSourceConnector, FrameSourceEvent};
pub use moment::{MomentPanorama, MomentStatus, SavedDefaults, frame_index, moment_yaw};

use crate::camera::SharedCamera;
use crate::context::Container;
use crate::controls::SharedControls;
use crate::render::RenderBackend;

/// Stable handle to a panorama inside a [`Tour`](crate::Tour).
///
/// Handles are never reused, so a handle to a disposed panorama simply stops
/// resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanoramaId(pub(crate) usize);

impl PanoramaId {
    /// Position of the panorama in its tour's arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PanoramaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panorama#{}", self.0)
    }
}

/// Lifecycle contract shared by every panorama variant.
///
/// Every method has a default that forwards to the embedded [`Panorama`], so
/// specialised nodes only override the hooks they extend and call back into
/// the base explicitly.
pub trait PanoramaNode {
    /// The base panorama state.
    fn panorama(&self) -> &Panorama;

    fn panorama_mut(&mut self) -> &mut Panorama;

    /// Begin loading. Has no effect once loading has started.
    fn load(&mut self, immediate: bool) {
        self.panorama_mut().load(immediate);
    }

    fn enter(&mut self) {
        self.panorama_mut().enter();
    }

    fn leave(&mut self) {
        self.panorama_mut().leave();
    }

    /// Fade in over `duration` ms, or the configured animation duration.
    fn fade_in(&mut self, duration: Option<f32>) {
        self.panorama_mut().fade_in(duration);
    }

    /// Fade out over `duration` ms, or the configured animation duration.
    fn fade_out(&mut self, duration: Option<f32>) {
        self.panorama_mut().fade_out(duration);
    }

    /// Advance every animation by `dt` milliseconds.
    fn update(&mut self, dt: f32, _backend: &mut dyn RenderBackend) -> TickOutcome {
        let outcome = self.panorama_mut().advance(dt);
        if outcome.load_requested {
            self.load(true);
        }
        outcome
    }

    /// Per-frame hook the viewer calls once the node has asked for it with
    /// [`ViewerRequest::AddUpdateCallback`](crate::ViewerRequest::AddUpdateCallback).
    fn viewer_tick(&mut self, _backend: &mut dyn RenderBackend) {}

    fn set_container(&mut self, container: Container) {
        self.panorama_mut().set_container(container);
    }

    fn set_camera(&mut self, camera: SharedCamera) {
        self.panorama_mut().set_camera(camera);
    }

    fn set_controls(&mut self, controls: SharedControls) {
        self.panorama_mut().set_controls(controls);
    }

    /// Release every resource. The node must not be used afterwards.
    fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.panorama_mut().dispose(backend);
    }
}

impl PanoramaNode for Panorama {
    fn panorama(&self) -> &Panorama {
        self
    }

    fn panorama_mut(&mut self) -> &mut Panorama {
        self
    }
}
