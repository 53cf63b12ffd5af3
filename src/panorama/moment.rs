//! Synchronized-video ("moment") panoramas.
//!
//! A moment is a video whose frames were shot around a single point. Instead
//! of playing it, the panorama shows the frame matching the direction the
//! camera faces, so turning the view scrubs through time.

use std::f32::consts::PI;
use std::fmt;

use log::debug;

use super::frame_source::{FrameData, FrameEvents, FrameSource, FrameSourceConnector, FrameSourceEvent};
use super::{LoadState, Panorama, PanoramaConfig, PanoramaNode, TickOutcome};
use crate::camera::SharedCamera;
use crate::controls::SharedControls;
use crate::events::{Event, ViewerRequest};
use crate::render::RenderBackend;

/// Loading progress of a moment. Only ever moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MomentStatus {
    #[default]
    None,
    FirstFrameDecoded,
    Ready,
    Completed,
}

impl MomentStatus {
    pub fn event_name(&self) -> &'static str {
        match self {
            MomentStatus::None => "panomoments.none",
            MomentStatus::FirstFrameDecoded => "panomoments.first_frame_decoded",
            MomentStatus::Ready => "panomoments.ready",
            MomentStatus::Completed => "panomoments.completed",
        }
    }

    /// The status that may follow this one.
    pub fn next(&self) -> MomentStatus {
        match self {
            MomentStatus::None => MomentStatus::FirstFrameDecoded,
            MomentStatus::FirstFrameDecoded => MomentStatus::Ready,
            MomentStatus::Ready | MomentStatus::Completed => MomentStatus::Completed,
        }
    }
}

/// Camera and controls settings to put back when the moment is left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SavedDefaults {
    pub fov: Option<f32>,
    pub min_polar_angle: Option<f32>,
    pub max_polar_angle: Option<f32>,
}

/// Moment yaw in degrees, in `[0, 360)`, for a camera yaw in degrees.
pub fn moment_yaw(camera_yaw_degrees: f32, clockwise: bool) -> f32 {
    let base = if clockwise { 90.0 } else { -90.0 };
    let yaw = (base - (camera_yaw_degrees + 180.0)).rem_euclid(360.0);
    if yaw >= 360.0 { 0.0 } else { yaw }
}

/// Frame to show for `yaw` degrees out of `frame_count` frames.
pub fn frame_index(yaw: f32, frame_count: u32) -> u32 {
    if frame_count == 0 {
        return 0;
    }
    let frame = (yaw / 360.0 * frame_count as f32).round() as u32;
    frame % frame_count
}

/// A panorama whose texture is driven by an external frame source.
///
/// # Example
///
/// ```no_run
/// use periscope::{FrameEvents, FrameSource, FrameSourceConnector, MomentPanorama, PanoramaNode};
///
/// struct Decoder;
///
/// impl FrameSourceConnector for Decoder {
///     fn connect(&mut self, identifier: &str, events: FrameEvents) -> Box<dyn FrameSource> {
///         unimplemented!("open {identifier} and report into {events:?}")
///     }
/// }
///
/// let mut moment = MomentPanorama::new("f1c8a6c1", Box::new(Decoder));
/// moment.load(false);
/// ```
pub struct MomentPanorama {
    base: Panorama,
    identifier: String,
    connector: Box<dyn FrameSourceConnector>,
    source: Option<Box<dyn FrameSource>>,
    events: FrameEvents,
    frame_data: Option<FrameData>,
    status: MomentStatus,
    /// Callbacks that arrived before the status preceding them.
    deferred: Vec<FrameSourceEvent>,
    defaults: SavedDefaults,
    tick_registered: bool,
}

impl fmt::Debug for MomentPanorama {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MomentPanorama")
            .field("identifier", &self.identifier)
            .field("status", &self.status)
            .field("frame_data", &self.frame_data)
            .field("connected", &self.source.is_some())
            .field("base", &self.base)
            .finish()
    }
}

impl MomentPanorama {
    pub fn new(identifier: impl Into<String>, connector: Box<dyn FrameSourceConnector>) -> Self {
        Self::with_config(identifier, connector, PanoramaConfig::default())
    }

    pub fn with_config(
        identifier: impl Into<String>,
        connector: Box<dyn FrameSourceConnector>,
        config: PanoramaConfig,
    ) -> Self {
        Self {
            base: Panorama::new(config),
            identifier: identifier.into(),
            connector,
            source: None,
            events: FrameEvents::new(),
            frame_data: None,
            status: MomentStatus::None,
            deferred: Vec::new(),
            defaults: SavedDefaults::default(),
            tick_registered: false,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn status(&self) -> MomentStatus {
        self.status
    }

    /// Metadata from the first decoded frame.
    pub fn frame_data(&self) -> Option<FrameData> {
        self.frame_data
    }

    pub fn defaults(&self) -> SavedDefaults {
        self.defaults
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// True while the viewer is asked to call [`PanoramaNode::viewer_tick`].
    pub fn is_tick_registered(&self) -> bool {
        self.tick_registered
    }

    /// Step to `status`, which must directly follow the current one.
    fn set_status(&mut self, status: MomentStatus) -> bool {
        if status == self.status || status != self.status.next() {
            debug!(
                "moment {} ignored {:?}, already {:?}",
                self.identifier, status, self.status
            );
            return false;
        }
        self.status = status;
        self.base.emit(Event::Moment(status));
        true
    }

    fn set_controls_enabled(&self, enabled: bool) {
        if let Some(controls) = self.base.controls() {
            controls.borrow_mut().enabled = enabled;
        }
    }

    /// Handle every frame-source notification queued since the last tick.
    fn pump(&mut self, backend: &mut dyn RenderBackend) {
        while let Some(event) = self.events.pop() {
            self.apply(event, backend);
        }
    }

    fn apply(&mut self, event: FrameSourceEvent, backend: &mut dyn RenderBackend) {
        let advanced = match event {
            FrameSourceEvent::FrameDecoded(data) => {
                if self.frame_data.is_some() {
                    return;
                }
                self.frame_data = Some(data);
                let texture = backend.create_video_texture(&self.identifier);
                if let Some(previous) = self.base.update_texture(texture) {
                    backend.release_texture(previous);
                }
                self.set_status(MomentStatus::FirstFrameDecoded);
                self.base.on_load();
                true
            }
            FrameSourceEvent::Ready | FrameSourceEvent::Loaded => {
                let target = match event {
                    FrameSourceEvent::Ready => MomentStatus::Ready,
                    _ => MomentStatus::Completed,
                };
                if target > self.status.next() {
                    debug!(
                        "moment {} holding {:?} until {:?}",
                        self.identifier,
                        target,
                        self.status.next()
                    );
                    self.deferred.push(event);
                    return;
                }
                let advanced = self.set_status(target);
                if advanced && target == MomentStatus::Ready {
                    self.set_controls_enabled(true);
                }
                advanced
            }
        };
        if advanced && !self.deferred.is_empty() {
            for held in std::mem::take(&mut self.deferred) {
                self.apply(held, backend);
            }
        }
    }

    /// Show the frame for `yaw` degrees.
    ///
    /// The texture is re-uploaded whenever the source has one ready; frames
    /// are only requested once the source can scrub.
    pub fn set_moment_yaw(&mut self, yaw: f32, backend: &mut dyn RenderBackend) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        if source.texture_ready()
            && let Some(texture) = self.base.texture()
        {
            backend.mark_texture_dirty(texture);
        }
        let scrubbable = matches!(self.status, MomentStatus::Ready | MomentStatus::Completed);
        if !scrubbable || self.frame_data.is_none() {
            return;
        }
        let frame = frame_index(yaw, source.frame_count());
        source.render(frame);
    }

    /// Face the moment's start frame and ask to be ticked by the viewer.
    fn begin_playback(&mut self) {
        if let Some(data) = self.frame_data {
            let angle = (data.start_frame + 180.0) / 180.0 * PI;
            self.base
                .emit(Event::ViewerHandler(ViewerRequest::SetControlCenter));
            self.base
                .emit(Event::ViewerHandler(ViewerRequest::RotateControlLeft(angle)));
        }
        match self.base.id() {
            Some(id) => {
                self.base
                    .emit(Event::ViewerHandler(ViewerRequest::AddUpdateCallback(id)));
                self.tick_registered = true;
            }
            None => debug!("moment {} is not part of a tour, no tick requested", self.identifier),
        }
    }

    /// Put back the camera and controls settings and stop being ticked.
    fn end_playback(&mut self) {
        if let Some(camera) = self.base.camera()
            && let Some(fov) = self.defaults.fov
        {
            camera.borrow_mut().fov = fov;
        }
        if let Some(controls) = self.base.controls() {
            let mut controls = controls.borrow_mut();
            if let Some(min) = self.defaults.min_polar_angle {
                controls.min_polar_angle = min;
            }
            if let Some(max) = self.defaults.max_polar_angle {
                controls.max_polar_angle = max;
            }
        }
        if self.tick_registered {
            self.tick_registered = false;
            if let Some(id) = self.base.id() {
                self.base
                    .emit(Event::ViewerHandler(ViewerRequest::RemoveUpdateCallback(id)));
            }
        }
    }
}

impl PanoramaNode for MomentPanorama {
    fn panorama(&self) -> &Panorama {
        &self.base
    }

    fn panorama_mut(&mut self) -> &mut Panorama {
        &mut self.base
    }

    /// Connect to the frame source. Completion is reported by the first
    /// decoded frame, never synchronously.
    fn load(&mut self, _immediate: bool) {
        if self.source.is_some() || self.base.state() != LoadState::Unloaded {
            debug!("moment {} is already loading", self.identifier);
            return;
        }
        self.base.load(false);
        self.set_controls_enabled(false);
        let source = self
            .connector
            .connect(&self.identifier, self.events.clone());
        self.source = Some(source);
    }

    fn fade_in(&mut self, duration: Option<f32>) {
        self.base.fade_in(duration);
        self.begin_playback();
    }

    fn update(&mut self, dt: f32, backend: &mut dyn RenderBackend) -> TickOutcome {
        self.pump(backend);
        let outcome = self.base.advance(dt);
        if outcome.load_requested {
            self.load(true);
        }
        if outcome.leave_completed {
            self.end_playback();
        }
        outcome
    }

    fn viewer_tick(&mut self, backend: &mut dyn RenderBackend) {
        let Some(data) = self.frame_data else {
            return;
        };
        if self.status == MomentStatus::None {
            return;
        }
        let Some(camera) = self.base.camera() else {
            return;
        };
        let yaw = moment_yaw(camera.borrow().yaw_degrees(), data.clockwise);
        self.set_moment_yaw(yaw, backend);
    }

    fn set_camera(&mut self, camera: SharedCamera) {
        if self.defaults.fov.is_none() {
            self.defaults.fov = Some(camera.borrow().fov);
        }
        self.base.set_camera(camera);
    }

    fn set_controls(&mut self, controls: SharedControls) {
        if self.defaults.min_polar_angle.is_none() {
            let current = controls.borrow();
            self.defaults.min_polar_angle = Some(current.min_polar_angle);
            self.defaults.max_polar_angle = Some(current.max_polar_angle);
        }
        self.base.set_controls(controls);
    }

    fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if self.base.is_disposed() {
            return;
        }
        self.end_playback();
        if let Some(mut source) = self.source.take() {
            source.dispose();
        }
        self.frame_data = None;
        self.deferred.clear();
        self.base.dispose(backend);
    }
}
