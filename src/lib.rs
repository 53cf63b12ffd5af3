//! # Periscope
//!
//! **The lifecycle core of a 360° panorama viewer.**
//!
//! Periscope decides *when* things happen in a panorama tour: when a panorama
//! loads, fades in, shows its hotspots, fades out and lets go of its GPU
//! resources. Drawing is left to whatever [`RenderBackend`] you plug in.
//!
//! ## Quick Start
//!
//! ```
//! use periscope::*;
//!
//! let mut tour = Tour::new(HeadlessBackend::new());
//! tour.set_camera(Camera::new().shared());
//! tour.set_controls(OrbitControls::new().shared());
//!
//! let hall = tour.add(Panorama::new(PanoramaConfig::new().animation_duration(300.0)));
//! let roof = tour.add(Panorama::default());
//! tour.link(hall, roof, Some(Vec3::new(0.0, 2000.0, -4000.0)), None, None).unwrap();
//!
//! tour.set_panorama(hall).unwrap();
//! for _ in 0..30 {
//!     tour.update(16.0);
//! }
//! assert_eq!(tour.panorama(hall).unwrap().opacity(), 1.0);
//! ```
//!
//! ## Pieces
//!
//! - [`Tween`] drives every animation. Nothing moves unless `update(dt)` is called.
//! - [`Panorama`] and [`MomentPanorama`] implement [`PanoramaNode`], the lifecycle
//!   contract the viewer programs against.
//! - [`Tour`] owns the navigation graph and plays the viewer's part.
//! - [`OrientationController`] turns device orientation into camera rotation.
//! - **Type-safe handles**: [`PanoramaId`], [`TextureId`] and friends prevent
//!   mix-ups at compile time.

mod camera;
mod context;
mod controls;
mod error;
mod events;
mod hotspot;
mod orientation;
mod panorama;
mod render;
mod tour;
mod tween;

pub use camera::{Camera, SharedCamera};
pub use context::{Container, ImageQuality, NodeContext};
pub use controls::{OrbitControls, OrbitMode, SharedControls};
pub use error::TourError;
pub use events::{Event, EventBus, EventKind, ListenerId, ViewerRequest};
pub use hotspot::{HOTSPOT_ANIMATION_DURATION, Hotspot, HotspotImage};
pub use orientation::{
    ConnectionState, DeviceSample, OrientationConfig, OrientationController, PermissionError,
    PermissionOutcome, PermissionRequest, ScreenAngle, SensorPlatform, compute_rotation,
};
pub use panorama::{
    FrameData, FrameEvents, FrameSource, FrameSourceConnector, FrameSourceEvent, LinkTarget,
    LoadState, MomentPanorama, MomentStatus, Panorama, PanoramaConfig, PanoramaId, PanoramaNode,
    SavedDefaults, TickOutcome, frame_index, moment_yaw,
};
pub use render::{
    GeometryId, HeadlessBackend, MaterialId, RenderBackend, RenderOp, SpriteId, TextureId,
};
pub use tour::Tour;
pub use tween::{Easing, Tween, TweenState, TweenStep};

// Re-export glam math types for convenience
pub use glam::{Quat, Vec2, Vec3};
