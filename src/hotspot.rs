//! Hotspots: positioned markers that link one panorama to another.

use glam::Vec3;

use crate::context::Container;
use crate::events::{Event, EventBus};
use crate::panorama::PanoramaId;
use crate::render::{RenderBackend, SpriteId};
use crate::tween::{Easing, Tween};

/// Duration of a hotspot's show/hide animation, in milliseconds.
pub const HOTSPOT_ANIMATION_DURATION: f32 = 500.0;

/// Picture drawn for a hotspot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HotspotImage {
    /// Built-in navigation arrow.
    #[default]
    Arrow,
    /// Image loaded from a URL by the rendering engine.
    Url(String),
}

impl HotspotImage {
    pub fn url(url: impl Into<String>) -> Self {
        HotspotImage::Url(url.into())
    }
}

/// A clickable marker inside a panorama that navigates to another panorama.
///
/// The target is a [`PanoramaId`], not an owning reference: hotspots never keep
/// their destination alive, so navigation graphs may freely contain cycles.
#[derive(Debug)]
pub struct Hotspot {
    /// Position in the owning panorama's local space.
    pub position: Vec3,
    pub scale: f32,
    pub image: HotspotImage,
    target: PanoramaId,
    visible: bool,
    revealing: bool,
    opacity: f32,
    animation: Tween,
    bus: EventBus,
    container: Option<Container>,
    sprite: Option<SpriteId>,
}

impl Hotspot {
    /// Create a hidden hotspot pointing at `target`.
    pub fn new(target: PanoramaId, position: Vec3, scale: f32, image: HotspotImage) -> Self {
        Self {
            position,
            scale,
            image,
            target,
            visible: false,
            revealing: false,
            opacity: 0.0,
            animation: Tween::default(),
            bus: EventBus::new(),
            container: None,
            sprite: None,
        }
    }

    /// Allocate the sprite used to draw this hotspot.
    pub fn attach_sprite(&mut self, backend: &mut dyn RenderBackend) {
        if self.sprite.is_none() {
            self.sprite = Some(backend.create_sprite(&self.image, self.scale));
        }
    }

    /// Destination of this edge.
    pub fn target(&self) -> PanoramaId {
        self.target
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn sprite(&self) -> Option<SpriteId> {
        self.sprite
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Fade the hotspot in after `delay` milliseconds.
    pub fn show(&mut self, delay: f32) {
        self.animate(1.0, delay, true);
    }

    /// Fade the hotspot out after `delay` milliseconds.
    pub fn hide(&mut self, delay: f32) {
        self.animate(0.0, delay, false);
    }

    fn animate(&mut self, to: f32, delay: f32, revealing: bool) {
        self.animation.stop();
        self.revealing = revealing;
        self.animation = Tween::between(self.opacity, to, HOTSPOT_ANIMATION_DURATION)
            .easing(Easing::QuarticOut)
            .delay(delay);
        self.animation.start();
    }

    /// Advance the show/hide animation by `dt` milliseconds.
    pub fn update(&mut self, dt: f32) {
        let step = self.animation.advance(dt);
        if step.started && self.revealing {
            self.visible = true;
        }
        if self.animation.is_running() || step.completed {
            self.opacity = step.value;
        }
        if step.completed && !self.revealing {
            self.visible = false;
        }
    }

    /// Remember the viewer container and announce it on this hotspot's bus.
    pub fn set_container(&mut self, container: Container) {
        self.container = Some(container.clone());
        self.bus.emit(Event::Container(container));
    }

    /// Deliver an event forwarded by the owning panorama.
    pub fn notify(&mut self, event: Event) {
        self.bus.emit(event);
    }

    /// Activate the hotspot. Returns the panorama it navigates to.
    pub fn activate(&mut self) -> PanoramaId {
        self.bus.emit(Event::Click);
        self.target
    }

    /// Stop animating and release the sprite.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.animation.stop();
        if let Some(sprite) = self.sprite.take() {
            backend.release_sprite(sprite);
        }
        self.bus.clear();
    }
}
