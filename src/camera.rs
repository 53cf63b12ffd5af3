use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Quat, Vec3};

/// Camera shared between the viewer, the active panorama, and the
/// orientation controller.
///
/// The viewer owns it; panoramas and controllers only borrow it for the
/// duration of a call.
pub type SharedCamera = Rc<RefCell<Camera>>;

/// A perspective camera sitting at the centre of a panorama.
///
/// Orientation is stored as a quaternion so that both the orbit controls and
/// the device-orientation controller can write it directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov: 60.0,
            near: 1.0,
            far: 10000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Wrap the camera for sharing with panoramas and controllers.
    pub fn shared(self) -> SharedCamera {
        Rc::new(RefCell::new(self))
    }

    /// Direction the camera looks at (local -Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Camera up vector (local +Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Rotation about the world Y axis in radians, using yaw-pitch-roll order.
    pub fn yaw(&self) -> f32 {
        let (yaw, _, _) = self.rotation.to_euler(EulerRot::YXZ);
        yaw
    }

    /// [`yaw`](Self::yaw) in degrees.
    pub fn yaw_degrees(&self) -> f32 {
        self.yaw().to_degrees()
    }
}
