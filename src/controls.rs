use std::cell::RefCell;
use std::f32::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use glam::{Quat, Vec2};

use crate::camera::Camera;

/// Input controls shared between the viewer and the active panorama.
pub type SharedControls = Rc<RefCell<OrbitControls>>;

/// Controls how the orbit controls move the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OrbitMode {
    /// User rotates the view by dragging.
    #[default]
    Interactive,
    /// View auto-rotates, ignoring drag input.
    AutoRotate {
        /// Rotation speed in radians per millisecond (positive = turning left).
        speed: f32,
    },
}

/// Look-around controls for a camera placed at the centre of a panorama.
///
/// The view direction is described by an azimuth around the vertical axis and
/// a polar angle measured from straight up (`0`) to straight down (`PI`), with
/// the horizon at `PI / 2`. Panoramas temporarily narrow the polar bounds and
/// restore them when they are left.
///
/// # Example
/// ```
/// use periscope::{Camera, OrbitControls};
///
/// let mut controls = OrbitControls::new().polar_limits(0.5, 2.5);
/// controls.rotate_left(std::f32::consts::FRAC_PI_2);
///
/// let mut camera = Camera::new();
/// controls.apply_to(&mut camera);
/// assert!((camera.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Horizontal angle in radians.
    pub azimuth: f32,
    /// Angle from the zenith in radians.
    pub polar: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    /// Disabled controls ignore drag input and auto-rotation.
    pub enabled: bool,
    pub mode: OrbitMode,
    /// Radians per dragged pixel.
    pub sensitivity: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            polar: FRAC_PI_2,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            enabled: true,
            mode: OrbitMode::Interactive,
            sensitivity: 0.005,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the control mode.
    pub fn mode(mut self, mode: OrbitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set drag sensitivity in radians per pixel.
    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set the allowed polar range (radians from the zenith).
    pub fn polar_limits(mut self, min: f32, max: f32) -> Self {
        self.min_polar_angle = min;
        self.max_polar_angle = max;
        self.polar = self.polar.clamp(min, max);
        self
    }

    /// Wrap the controls for sharing with panoramas.
    pub fn shared(self) -> SharedControls {
        Rc::new(RefCell::new(self))
    }

    /// Look back at the initial heading (azimuth 0, on the horizon).
    pub fn reset_center(&mut self) {
        self.azimuth = 0.0;
        self.polar = FRAC_PI_2.clamp(self.min_polar_angle, self.max_polar_angle);
    }

    /// Turn the view left by `angle` radians.
    pub fn rotate_left(&mut self, angle: f32) {
        self.azimuth += angle;
    }

    /// Turn the view up by `angle` radians, respecting the polar bounds.
    pub fn rotate_up(&mut self, angle: f32) {
        self.polar = (self.polar - angle).clamp(self.min_polar_angle, self.max_polar_angle);
    }

    /// Apply a drag of `delta` pixels.
    pub fn drag(&mut self, delta: Vec2) {
        if !self.enabled || !matches!(self.mode, OrbitMode::Interactive) {
            return;
        }
        self.rotate_left(delta.x * self.sensitivity);
        self.rotate_up(delta.y * self.sensitivity);
    }

    /// Advance auto-rotation by `dt` milliseconds.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        if let OrbitMode::AutoRotate { speed } = self.mode {
            self.rotate_left(speed * dt);
        }
    }

    /// Camera orientation for the current azimuth and polar angle.
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.azimuth) * Quat::from_rotation_x(FRAC_PI_2 - self.polar)
    }

    /// Write the current orientation into `camera`.
    pub fn apply_to(&self, camera: &mut Camera) {
        camera.rotation = self.rotation();
    }
}
