//! The base panorama: load state, enter/leave transitions, fades and hotspots.

use std::rc::Rc;

use glam::Vec3;
use log::{debug, warn};

use super::PanoramaId;
use crate::camera::SharedCamera;
use crate::context::{Container, ImageQuality, NodeContext};
use crate::controls::SharedControls;
use crate::events::{Event, EventBus, ViewerRequest};
use crate::hotspot::{Hotspot, HotspotImage};
use crate::render::{GeometryId, MaterialId, RenderBackend, TextureId};
use crate::tween::{Easing, Tween};

/// Tunables for a panorama.
///
/// # Example
///
/// ```
/// use periscope::PanoramaConfig;
///
/// let config = PanoramaConfig::new()
///     .animation_duration(600.0)
///     .default_link_scale(250.0);
/// assert_eq!(config.animation_duration, 600.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PanoramaConfig {
    /// Duration of enter/leave transitions and fades, in milliseconds.
    pub animation_duration: f32,
    /// Edge length of the skybox the panorama is drawn on.
    pub edge_length: f32,
    /// Hotspot scale used by `link` when neither the caller nor the target
    /// panorama provides one.
    pub default_link_scale: f32,
}

impl Default for PanoramaConfig {
    fn default() -> Self {
        Self {
            animation_duration: 1000.0,
            edge_length: 10000.0,
            default_link_scale: 300.0,
        }
    }
}

impl PanoramaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animation_duration(mut self, duration: f32) -> Self {
        self.animation_duration = duration;
        self
    }

    pub fn edge_length(mut self, edge_length: f32) -> Self {
        self.edge_length = edge_length;
        self
    }

    pub fn default_link_scale(mut self, scale: f32) -> Self {
        self.default_link_scale = scale;
        self
    }
}

/// Loading progress. Only ever moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// What a `link` call needs to know about the destination panorama.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkTarget {
    pub id: PanoramaId,
    /// Hotspot image the destination asks to be linked with.
    pub image: Option<HotspotImage>,
    /// Hotspot scale the destination asks to be linked with.
    pub scale: Option<f32>,
}

impl LinkTarget {
    /// A destination without linking preferences.
    pub fn new(id: PanoramaId) -> Self {
        Self {
            id,
            image: None,
            scale: None,
        }
    }
}

/// Notable transitions that happened during one [`Panorama::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The enter transition started on an unloaded panorama.
    pub load_requested: bool,
    pub enter_completed: bool,
    pub faded_in: bool,
    /// The fade-out finished and the panorama is hidden.
    pub leave_completed: bool,
}

/// A single 360° environment with its hotspots and transition state.
///
/// Camera, controls and container are not owned: the viewer hands them in
/// through [`set_camera`](Self::set_camera), [`set_controls`](Self::set_controls)
/// and [`set_container`](Self::set_container), possibly long after
/// construction.
#[derive(Debug)]
pub struct Panorama {
    id: Option<PanoramaId>,
    config: PanoramaConfig,
    state: LoadState,
    active: bool,
    visible: bool,
    opacity: f32,
    hotspots: Vec<Hotspot>,
    hotspots_visible: bool,
    linking_image: Option<HotspotImage>,
    linking_scale: Option<f32>,
    context: NodeContext,
    bus: EventBus,
    enter_transition: Tween,
    leave_transition: Tween,
    fade_in_animation: Tween,
    fade_out_animation: Tween,
    fade_duration: f32,
    infospot_animation: Tween,
    infospot_target: bool,
    geometry: Option<GeometryId>,
    material: Option<MaterialId>,
    texture: Option<TextureId>,
    disposed: bool,
}

impl Default for Panorama {
    fn default() -> Self {
        Self::new(PanoramaConfig::default())
    }
}

impl Panorama {
    /// Create an unloaded, hidden panorama.
    pub fn new(config: PanoramaConfig) -> Self {
        let fade_duration = config.animation_duration;
        Self {
            id: None,
            config,
            state: LoadState::Unloaded,
            active: false,
            visible: false,
            opacity: 0.0,
            hotspots: Vec::new(),
            hotspots_visible: false,
            linking_image: None,
            linking_scale: None,
            context: NodeContext::default(),
            bus: EventBus::new(),
            enter_transition: Tween::default(),
            leave_transition: Tween::default(),
            fade_in_animation: Tween::default(),
            fade_out_animation: Tween::default(),
            fade_duration,
            infospot_animation: Tween::default(),
            infospot_target: false,
            geometry: None,
            material: None,
            texture: None,
            disposed: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Handle assigned when the panorama was added to a tour.
    pub fn id(&self) -> Option<PanoramaId> {
        self.id
    }

    pub(crate) fn bind_id(&mut self, id: PanoramaId) {
        self.id = Some(id);
    }

    pub fn config(&self) -> &PanoramaConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn hotspot_mut(&mut self, index: usize) -> Option<&mut Hotspot> {
        self.hotspots.get_mut(index)
    }

    /// Last requested hotspot visibility.
    pub fn hotspots_visible(&self) -> bool {
        self.hotspots_visible
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    pub fn container(&self) -> Option<&Container> {
        self.context.container.as_ref()
    }

    pub fn camera(&self) -> Option<&SharedCamera> {
        self.context.camera.as_ref()
    }

    pub fn controls(&self) -> Option<&SharedControls> {
        self.context.controls.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn geometry(&self) -> Option<GeometryId> {
        self.geometry
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Image quality tier suited to the current container.
    pub fn zoom_level(&self) -> ImageQuality {
        self.context.image_quality()
    }

    /// How other panoramas should link to this one.
    pub fn link_target(&self, id: PanoramaId) -> LinkTarget {
        LinkTarget {
            id,
            image: self.linking_image.clone(),
            scale: self.linking_scale,
        }
    }

    /// Set the hotspot image and scale used when other panoramas link here.
    pub fn set_linking_image(&mut self, image: HotspotImage, scale: Option<f32>) {
        self.linking_image = Some(image);
        self.linking_scale = scale;
    }

    /// Emit an event on this panorama's bus.
    pub fn emit(&mut self, event: Event) {
        self.bus.emit(event);
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Allocate the skybox and any missing hotspot sprites. Idempotent.
    pub fn allocate_resources(&mut self, backend: &mut dyn RenderBackend) {
        if self.geometry.is_none() {
            self.geometry = Some(backend.create_skybox_geometry(self.config.edge_length));
        }
        if self.material.is_none() {
            self.material = Some(backend.create_panorama_material());
        }
        for hotspot in &mut self.hotspots {
            hotspot.attach_sprite(backend);
        }
    }

    /// Bind a new texture. Returns the previously bound one, which the caller
    /// now owns.
    pub fn update_texture(&mut self, texture: TextureId) -> Option<TextureId> {
        self.texture.replace(texture)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Start loading. With `immediate`, completes synchronously.
    pub fn load(&mut self, immediate: bool) {
        if self.state != LoadState::Unloaded {
            debug!("load ignored, panorama is already {:?}", self.state);
            return;
        }
        self.state = LoadState::Loading;
        self.emit(Event::LoadStart);
        if immediate {
            self.on_load();
        }
    }

    /// Loading finished: emits `loaded`, `load` and `ready`, in that order.
    pub fn on_load(&mut self) {
        if self.state != LoadState::Loading {
            debug!("on_load ignored, panorama is {:?}", self.state);
            return;
        }
        self.state = LoadState::Loaded;
        self.emit(Event::Loaded);
        self.emit(Event::Load);
        self.emit(Event::Ready);
    }

    pub fn on_progress(&mut self, loaded: u64, total: u64) {
        self.emit(Event::Progress { loaded, total });
    }

    /// Loading failed. The panorama still reports ready so the viewer can
    /// show whatever it has.
    pub fn on_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("panorama failed to load: {}", message);
        self.emit(Event::Error(message));
        self.emit(Event::Ready);
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start the enter transition and mark the panorama active.
    pub fn enter(&mut self) {
        let duration = self.config.animation_duration;
        self.emit(Event::Enter);
        self.leave_transition.stop();
        self.enter_transition = Tween::new(duration).easing(Easing::QuarticOut);
        self.enter_transition.start();
        for hotspot in &mut self.hotspots {
            hotspot.notify(Event::PanoramaEnter);
        }
        self.active = true;
    }

    /// Start the leave transition and mark the panorama inactive.
    pub fn leave(&mut self) {
        let duration = self.config.animation_duration;
        self.enter_transition.stop();
        self.leave_transition = Tween::new(duration).easing(Easing::QuarticOut);
        self.leave_transition.start();
        self.emit(Event::Leave);
        for hotspot in &mut self.hotspots {
            hotspot.notify(Event::PanoramaLeave);
        }
        self.active = false;
    }

    /// Animate opacity to 1, cancelling any fade-out in flight.
    pub fn fade_in(&mut self, duration: Option<f32>) {
        let duration = duration.unwrap_or(self.config.animation_duration);
        self.emit(Event::FadeIn);
        self.fade_out_animation.stop();
        self.fade_duration = duration;
        self.fade_in_animation =
            Tween::between(self.opacity, 1.0, duration).easing(Easing::QuarticOut);
        self.fade_in_animation.start();
    }

    /// Animate opacity to 0, cancelling any fade-in in flight.
    pub fn fade_out(&mut self, duration: Option<f32>) {
        let duration = duration.unwrap_or(self.config.animation_duration);
        self.emit(Event::FadeOut);
        self.fade_in_animation.stop();
        self.fade_duration = duration;
        self.fade_out_animation =
            Tween::between(self.opacity, 0.0, duration).easing(Easing::QuarticOut);
        self.fade_out_animation.start();
    }

    /// True while a fade in either direction is in flight.
    pub fn is_fading(&self) -> bool {
        self.fade_in_animation.is_running() || self.fade_out_animation.is_running()
    }

    /// Show or hide every hotspot after `delay` ms. `None` flips the current
    /// visibility.
    pub fn toggle_hotspot_visibility(&mut self, visible: Option<bool>, delay: f32) {
        let visible = visible.unwrap_or(!self.hotspots_visible);
        for hotspot in &mut self.hotspots {
            if visible {
                hotspot.show(delay);
            } else {
                hotspot.hide(delay);
            }
        }
        self.hotspots_visible = visible;
        self.infospot_target = visible;
        self.infospot_animation = Tween::new(self.config.animation_duration / 2.0).delay(delay);
        self.infospot_animation.start();
    }

    /// Advance every animation by `dt` ms.
    ///
    /// Tweens started from inside this call first advance on the next one.
    /// Loading is not triggered here; see [`TickOutcome::load_requested`].
    pub fn advance(&mut self, dt: f32) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for hotspot in &mut self.hotspots {
            hotspot.update(dt);
        }

        if self.infospot_animation.advance(dt).completed {
            let visible = self.infospot_target;
            self.emit(Event::InfospotAnimationComplete { visible });
        }

        let fade_in = self.fade_in_animation.advance(dt);
        if fade_in.started {
            self.visible = true;
            self.emit(Event::EnterFadeStart);
        }
        if self.fade_in_animation.is_running() || fade_in.completed {
            self.opacity = fade_in.value;
        }
        if fade_in.completed {
            self.toggle_hotspot_visibility(Some(true), self.fade_duration / 2.0);
            self.emit(Event::EnterFadeComplete);
            outcome.faded_in = true;
        }

        let fade_out = self.fade_out_animation.advance(dt);
        if self.fade_out_animation.is_running() || fade_out.completed {
            self.opacity = fade_out.value;
        }
        if fade_out.completed {
            self.visible = false;
            self.emit(Event::LeaveComplete);
            outcome.leave_completed = true;
        }

        let enter = self.enter_transition.advance(dt);
        if enter.started {
            self.emit(Event::EnterStart);
            if self.is_loaded() {
                self.emit(Event::Ready);
            } else {
                outcome.load_requested = true;
            }
        }
        if enter.completed {
            self.emit(Event::EnterComplete);
            outcome.enter_completed = true;
        }

        if self.leave_transition.advance(dt).started {
            self.emit(Event::LeaveStart);
            self.fade_out(Some(self.config.animation_duration));
            self.toggle_hotspot_visibility(Some(false), 0.0);
        }

        outcome
    }

    // ========================================================================
    // Context injection
    // ========================================================================

    /// Store the viewer container and forward it to every hotspot.
    pub fn set_container(&mut self, container: Container) {
        for hotspot in &mut self.hotspots {
            hotspot.set_container(container.clone());
        }
        self.context.container = Some(container.clone());
        self.emit(Event::Container(container));
    }

    pub fn set_camera(&mut self, camera: SharedCamera) {
        self.context.camera = Some(Rc::clone(&camera));
        self.emit(Event::Camera(camera));
    }

    pub fn set_controls(&mut self, controls: SharedControls) {
        self.context.controls = Some(Rc::clone(&controls));
        self.emit(Event::Controls(controls));
    }

    // ========================================================================
    // Navigation graph
    // ========================================================================

    /// Add a hotspot, handing it the container if one is known.
    pub fn add_hotspot(&mut self, mut hotspot: Hotspot) -> usize {
        if let Some(container) = &self.context.container {
            hotspot.set_container(container.clone());
        }
        self.hotspots.push(hotspot);
        self.hotspots.len() - 1
    }

    /// Create a hotspot at `position` that navigates to `target`.
    ///
    /// Scale and image fall back to the target's linking preferences, then to
    /// the configured default scale and the built-in arrow. Without a
    /// position nothing is created. Returns the index of the new hotspot.
    ///
    /// Sprites are allocated on the next
    /// [`allocate_resources`](Self::allocate_resources).
    pub fn link(
        &mut self,
        target: LinkTarget,
        position: Option<Vec3>,
        scale: Option<f32>,
        image: Option<HotspotImage>,
    ) -> Option<usize> {
        let Some(position) = position else {
            warn!("link to {} ignored: no hotspot position given", target.id);
            return None;
        };
        let scale = scale
            .or(target.scale)
            .unwrap_or(self.config.default_link_scale);
        let image = image.or(target.image).unwrap_or_default();
        Some(self.add_hotspot(Hotspot::new(target.id, position, scale, image)))
    }

    /// Activate a hotspot and ask the viewer to switch to its target.
    pub fn activate_hotspot(&mut self, index: usize) -> Option<PanoramaId> {
        let target = self.hotspots.get_mut(index)?.activate();
        self.emit(Event::ViewerHandler(ViewerRequest::SetPanorama(target)));
        Some(target)
    }

    /// A click that hit no hotspot: tell every hotspot to dismiss itself.
    pub fn dismiss(&mut self) {
        for hotspot in &mut self.hotspots {
            hotspot.notify(Event::Dismiss);
        }
    }

    /// Hotspot targets, in hotspot order.
    pub fn link_targets(&self) -> impl Iterator<Item = PanoramaId> + '_ {
        self.hotspots.iter().map(Hotspot::target)
    }

    // ========================================================================
    // Disposal
    // ========================================================================

    /// Stop every animation, tell the viewer, then release hotspots before
    /// the panorama's own resources.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if self.disposed {
            warn!("panorama {:?} disposed twice", self.id);
            return;
        }

        self.infospot_animation.stop();
        self.fade_in_animation.stop();
        self.fade_out_animation.stop();
        self.enter_transition.stop();
        self.leave_transition.stop();

        self.emit(Event::ViewerHandler(ViewerRequest::PanoramaDisposed(self.id)));

        for hotspot in self.hotspots.iter_mut().rev() {
            hotspot.dispose(backend);
        }
        self.hotspots.clear();

        if let Some(texture) = self.texture.take() {
            backend.release_texture(texture);
        }
        if let Some(geometry) = self.geometry.take() {
            backend.release_geometry(geometry);
        }
        if let Some(material) = self.material.take() {
            backend.release_material(material);
        }

        self.active = false;
        self.visible = false;
        self.disposed = true;
        self.bus.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::hotspot::HOTSPOT_ANIMATION_DURATION;
    use crate::panorama::PanoramaNode;
    use crate::render::{HeadlessBackend, RenderOp};
    use std::cell::RefCell;

    type Journal = Rc<RefCell<Vec<&'static str>>>;

    fn recorded(config: PanoramaConfig) -> (Panorama, Journal) {
        let mut pano = Panorama::new(config);
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&journal);
        pano.bus_mut()
            .on_any(move |event| log.borrow_mut().push(event.name()));
        (pano, journal)
    }

    fn count(journal: &Journal, name: &str) -> usize {
        journal.borrow().iter().filter(|n| **n == name).count()
    }

    fn target(index: usize) -> LinkTarget {
        LinkTarget::new(PanoramaId(index))
    }

    #[test]
    fn immediate_load_emits_in_order() {
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.load(true);
        assert_eq!(*journal.borrow(), vec!["load-start", "loaded", "load", "ready"]);
        assert_eq!(pano.state(), LoadState::Loaded);
    }

    #[test]
    fn load_twice_has_no_second_effect() {
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.load(true);
        pano.load(true);
        assert_eq!(count(&journal, "load-start"), 1);
        assert_eq!(count(&journal, "loaded"), 1);
    }

    #[test]
    fn deferred_load_waits_for_on_load() {
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.load(false);
        assert_eq!(pano.state(), LoadState::Loading);
        pano.load(true);
        assert_eq!(pano.state(), LoadState::Loading);

        pano.on_load();
        pano.on_load();
        assert_eq!(pano.state(), LoadState::Loaded);
        assert_eq!(count(&journal, "ready"), 1);
    }

    #[test]
    fn on_load_before_load_is_ignored() {
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.on_load();
        assert_eq!(pano.state(), LoadState::Unloaded);
        assert!(journal.borrow().is_empty());

        pano.load(false);
        pano.on_load();
        assert_eq!(count(&journal, "load-start"), 1);
        assert_eq!(count(&journal, "loaded"), 1);
    }

    #[test]
    fn standalone_dispose_notifies_viewer() {
        let mut backend = HeadlessBackend::new();
        let mut pano = Panorama::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        pano.bus_mut().on(EventKind::ViewerHandler, move |event| {
            if let Event::ViewerHandler(request) = event {
                log.borrow_mut().push(request.clone());
            }
        });

        pano.dispose(&mut backend);
        assert_eq!(*seen.borrow(), vec![ViewerRequest::PanoramaDisposed(None)]);
    }

    #[test]
    fn enter_loads_on_first_tick() {
        let mut backend = HeadlessBackend::new();
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.enter();
        assert!(pano.is_active());
        assert_eq!(*journal.borrow(), vec!["enter"]);

        let outcome = pano.update(16.0, &mut backend);
        assert!(outcome.load_requested);
        assert!(pano.is_loaded());
        assert_eq!(
            *journal.borrow(),
            vec!["enter", "enter-start", "load-start", "loaded", "load", "ready"]
        );
    }

    #[test]
    fn enter_when_loaded_reports_ready() {
        let mut backend = HeadlessBackend::new();
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.load(true);
        journal.borrow_mut().clear();

        pano.enter();
        let outcome = pano.update(0.0, &mut backend);
        assert!(!outcome.load_requested);
        assert_eq!(*journal.borrow(), vec!["enter", "enter-start", "ready"]);
    }

    #[test]
    fn leave_right_after_enter_cancels_enter() {
        let mut backend = HeadlessBackend::new();
        let (mut pano, journal) = recorded(PanoramaConfig::default());
        pano.enter();
        pano.leave();
        assert!(!pano.is_active());

        for _ in 0..10 {
            pano.update(500.0, &mut backend);
        }
        assert_eq!(count(&journal, "enter-start"), 0);
        assert_eq!(count(&journal, "enter-complete"), 0);
        assert_eq!(count(&journal, "ready"), 0);
        assert!(!pano.is_loaded());
        assert_eq!(count(&journal, "leave-start"), 1);
        assert_eq!(count(&journal, "leave-complete"), 1);
    }

    #[test]
    fn enter_completes_after_duration() {
        let mut backend = HeadlessBackend::new();
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        pano.enter();
        pano.update(50.0, &mut backend);
        assert_eq!(count(&journal, "enter-complete"), 0);
        let outcome = pano.update(50.0, &mut backend);
        assert!(outcome.enter_completed);
        assert_eq!(count(&journal, "enter-complete"), 1);
    }

    #[test]
    fn fade_out_cancels_fade_in() {
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        pano.fade_in(None);
        pano.fade_out(None);
        assert!(pano.is_fading());

        for _ in 0..5 {
            pano.advance(100.0);
        }
        assert_eq!(count(&journal, "enter-fade-start"), 0);
        assert_eq!(count(&journal, "enter-fade-complete"), 0);
        assert_eq!(count(&journal, "leave-complete"), 1);
        assert!(!pano.is_fading());
    }

    #[test]
    fn fade_in_then_out_leaves_single_animation() {
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        pano.fade_in(None);
        pano.advance(10.0);
        assert!(pano.is_visible());

        pano.fade_out(Some(40.0));
        let outcome = pano.advance(40.0);
        assert!(outcome.leave_completed);
        assert!(!outcome.faded_in);
        assert!(!pano.is_visible());
        assert_eq!(pano.opacity(), 0.0);
        assert_eq!(count(&journal, "enter-fade-complete"), 0);
    }

    #[test]
    fn fade_in_reveals_hotspots_at_half_duration() {
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        pano.link(target(1), Some(Vec3::X), None, None);
        pano.fade_in(None);

        pano.advance(0.0);
        let outcome = pano.advance(100.0);
        assert!(outcome.faded_in);
        assert_eq!(pano.opacity(), 1.0);
        assert!(pano.hotspots_visible());
        assert!(!pano.hotspots()[0].is_visible());

        // Hotspot delay is half the fade duration.
        pano.advance(49.0);
        assert!(!pano.hotspots()[0].is_visible());
        pano.advance(2.0);
        assert!(pano.hotspots()[0].is_visible());

        pano.advance(100.0);
        assert_eq!(count(&journal, "infospot-animation-complete"), 1);
    }

    #[test]
    fn toggle_without_argument_flips_visibility() {
        let mut pano = Panorama::new(PanoramaConfig::new().animation_duration(100.0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        pano.bus_mut()
            .on(EventKind::InfospotAnimationComplete, move |event| {
                if let Event::InfospotAnimationComplete { visible } = event {
                    log.borrow_mut().push(*visible);
                }
            });

        pano.toggle_hotspot_visibility(None, 0.0);
        pano.advance(50.0);
        pano.toggle_hotspot_visibility(None, 20.0);
        assert_eq!(*seen.borrow(), vec![true]);
        pano.advance(60.0);
        assert_eq!(*seen.borrow(), vec![true]);
        pano.advance(10.0);
        assert_eq!(*seen.borrow(), vec![true, false]);
        assert!(!pano.hotspots_visible());
    }

    #[test]
    fn leave_fades_out_and_hides_hotspots() {
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        pano.link(target(1), Some(Vec3::X), None, None);
        pano.load(true);
        pano.fade_in(None);
        pano.advance(0.0);
        pano.advance(100.0);
        pano.advance(200.0);
        assert!(pano.hotspots()[0].is_visible());

        pano.leave();
        pano.advance(0.0);
        assert!(!pano.hotspots_visible());
        assert_eq!(count(&journal, "leave-start"), 1);
        assert_eq!(count(&journal, "fade-out"), 1);

        pano.advance(100.0);
        assert_eq!(count(&journal, "leave-complete"), 1);
        assert!(!pano.is_visible());
        assert!(pano.hotspots()[0].is_visible());

        pano.advance(HOTSPOT_ANIMATION_DURATION);
        assert!(!pano.hotspots()[0].is_visible());
    }

    #[test]
    fn link_without_position_is_a_no_op() {
        let mut pano = Panorama::default();
        assert_eq!(pano.link(target(3), None, Some(1.0), None), None);
        assert!(pano.hotspots().is_empty());
    }

    #[test]
    fn link_defaults_follow_precedence() {
        let mut pano = Panorama::new(PanoramaConfig::new().default_link_scale(123.0));
        let mut preferring = Panorama::default();
        preferring.set_linking_image(HotspotImage::url("door.png"), Some(50.0));
        let preferred = preferring.link_target(PanoramaId(2));

        pano.link(target(1), Some(Vec3::Y), None, None);
        pano.link(preferred.clone(), Some(Vec3::Y), None, None);
        pano.link(preferred, Some(Vec3::Y), Some(9.0), Some(HotspotImage::url("x.png")));

        let spots = pano.hotspots();
        assert_eq!(spots[0].scale, 123.0);
        assert_eq!(spots[0].image, HotspotImage::Arrow);
        assert_eq!(spots[1].scale, 50.0);
        assert_eq!(spots[1].image, HotspotImage::url("door.png"));
        assert_eq!(spots[2].scale, 9.0);
        assert_eq!(spots[2].image, HotspotImage::url("x.png"));
        assert_eq!(spots[2].target(), PanoramaId(2));
    }

    #[test]
    fn activate_hotspot_requests_panorama_switch() {
        let mut pano = Panorama::default();
        let requests = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&requests);
        pano.bus_mut().on(EventKind::ViewerHandler, move |event| {
            if let Event::ViewerHandler(request) = event {
                log.borrow_mut().push(request.clone());
            }
        });
        pano.link(target(4), Some(Vec3::Z), None, None);

        assert_eq!(pano.activate_hotspot(0), Some(PanoramaId(4)));
        assert_eq!(pano.activate_hotspot(1), None);
        assert_eq!(
            *requests.borrow(),
            vec![ViewerRequest::SetPanorama(PanoramaId(4))]
        );
    }

    #[test]
    fn container_is_forwarded_to_hotspots() {
        let mut pano = Panorama::default();
        pano.link(target(1), Some(Vec3::X), None, None);
        pano.set_container(Container::new(1024, 768));
        pano.link(target(2), Some(Vec3::Y), None, None);

        assert!(pano.hotspots().iter().all(|h| h.container().is_some()));
        assert_eq!(pano.zoom_level(), ImageQuality::Medium);
    }

    #[test]
    fn dispose_releases_hotspots_before_own_resources() {
        let mut backend = HeadlessBackend::new();
        let journal = backend.journal();
        let mut pano = Panorama::default();
        pano.bind_id(PanoramaId(0));
        for i in 0..3 {
            pano.link(target(i + 1), Some(Vec3::X), None, None);
        }
        pano.allocate_resources(&mut backend);
        let geometry = pano.geometry().unwrap();
        let material = pano.material().unwrap();

        let disposed = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&disposed);
        pano.bus_mut().on(EventKind::ViewerHandler, move |event| {
            if let Event::ViewerHandler(ViewerRequest::PanoramaDisposed(_)) = event {
                *counter.borrow_mut() += 1;
            }
        });

        pano.enter();
        pano.fade_in(None);
        pano.dispose(&mut backend);
        assert_eq!(*disposed.borrow(), 1);
        assert!(pano.hotspots().is_empty());

        let ops = journal.borrow();
        let sprite_releases: Vec<usize> = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| matches!(op, RenderOp::ReleaseSprite(_)))
            .map(|(i, _)| i)
            .collect();
        let geometry_release = ops
            .iter()
            .position(|op| *op == RenderOp::ReleaseGeometry(geometry))
            .unwrap();
        let material_release = ops
            .iter()
            .position(|op| *op == RenderOp::ReleaseMaterial(material))
            .unwrap();
        assert_eq!(sprite_releases.len(), 3);
        assert!(sprite_releases.iter().all(|i| *i < geometry_release));
        assert!(sprite_releases.iter().all(|i| *i < material_release));
    }

    #[test]
    fn dispose_stops_pending_callbacks() {
        let (mut pano, journal) = recorded(PanoramaConfig::new().animation_duration(100.0));
        let mut backend = HeadlessBackend::new();
        pano.enter();
        pano.fade_in(None);
        pano.dispose(&mut backend);
        let before = journal.borrow().len();

        for _ in 0..5 {
            pano.advance(100.0);
        }
        assert_eq!(journal.borrow().len(), before);
        assert!(pano.is_disposed());
    }
}
