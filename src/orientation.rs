//! Device-orientation camera control.
//!
//! [`OrientationController`] turns raw device orientation samples into a
//! camera rotation, compensating for how the screen is held. It talks to the
//! host through a [`SensorPlatform`]; on platforms that gate the sensors
//! behind a permission prompt the request is answered asynchronously through
//! a single-shot channel that the controller polls.
//!
//! # Example
//!
//! ```
//! use periscope::{Camera, DeviceSample, OrientationController};
//!
//! let camera = Camera::new().shared();
//! let mut controller = OrientationController::new(camera.clone());
//! controller.listen();
//!
//! // Device lying flat: the camera looks straight down.
//! controller.on_device_orientation(DeviceSample::new(0.0, 0.0, 0.0));
//! assert!(camera.borrow().forward().y < -0.99);
//! ```

use glam::{Quat, Vec2, Vec3};
use log::{debug, error, warn};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::camera::SharedCamera;

/// Raw device orientation, in degrees.
///
/// `alpha`, `beta` and `gamma` are intrinsic Tait-Bryan angles of type
/// Z-X'-Y'' as reported by the device.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceSample {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl DeviceSample {
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self { alpha, beta, gamma }
    }
}

/// How the screen is rotated relative to the device's natural orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScreenAngle {
    #[default]
    Portrait,
    LandscapeLeft,
    UpsideDown,
    LandscapeRight,
}

impl ScreenAngle {
    /// Closest screen angle to `degrees`, anything else reads as portrait.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => ScreenAngle::LandscapeLeft,
            180 => ScreenAngle::UpsideDown,
            270 => ScreenAngle::LandscapeRight,
            _ => ScreenAngle::Portrait,
        }
    }

    pub fn degrees(&self) -> f32 {
        match self {
            ScreenAngle::Portrait => 0.0,
            ScreenAngle::LandscapeLeft => 90.0,
            ScreenAngle::UpsideDown => 180.0,
            ScreenAngle::LandscapeRight => -90.0,
        }
    }
}

/// Answer to a sensor permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    /// The platform has no orientation sensors.
    Unavailable,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unable to use the device orientation API: {0}")]
    Platform(String),
    #[error("permission request was dropped before it was answered")]
    Dropped,
}

/// Receiving end of a pending permission request.
pub type PermissionRequest = oneshot::Receiver<Result<PermissionOutcome, PermissionError>>;

/// Host services the controller depends on.
pub trait SensorPlatform {
    fn screen_angle(&self) -> ScreenAngle;

    /// True when sensors may only be read after the user grants permission.
    fn permission_required(&self) -> bool;

    /// Ask for permission. The answer arrives on the returned receiver.
    fn request_permission(&mut self) -> PermissionRequest;
}

/// Where the controller is in its connect/permission handshake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    AwaitingPermission,
    Connected,
    /// Permission was denied or failed. Only a new `connect` leaves this state.
    Refused,
}

/// Tunables for [`OrientationController`].
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationConfig {
    /// Degrees of rotation per pixel of drag.
    pub drag_degrees_per_pixel: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            drag_degrees_per_pixel: 0.25,
        }
    }
}

impl OrientationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_degrees_per_pixel(mut self, degrees: f32) -> Self {
        self.drag_degrees_per_pixel = degrees;
        self
    }
}

/// Camera rotation for a device orientation, all angles in radians.
///
/// `drag_pitch` tilts the view around the axis that is horizontal on screen
/// for the given screen angle.
pub fn compute_rotation(alpha: f32, beta: f32, gamma: f32, screen: ScreenAngle, drag_pitch: f32) -> Quat {
    let device = Quat::from_rotation_y(alpha) * Quat::from_rotation_x(beta) * Quat::from_rotation_z(-gamma);

    // Camera looks out of the back of the device, not the top.
    let back = Quat::from_xyzw(-0.5f32.sqrt(), 0.0, 0.0, 0.5f32.sqrt());
    let finger = match screen {
        ScreenAngle::Portrait => Quat::from_axis_angle(Vec3::X, -drag_pitch),
        ScreenAngle::UpsideDown => Quat::from_axis_angle(Vec3::X, drag_pitch),
        ScreenAngle::LandscapeLeft => Quat::from_axis_angle(Vec3::Y, drag_pitch),
        ScreenAngle::LandscapeRight => Quat::from_axis_angle(Vec3::Y, -drag_pitch),
    };

    let screen_adjust = Quat::from_axis_angle(Vec3::Z, -screen.degrees().to_radians());
    (device * (back * finger) * screen_adjust).normalize()
}

/// Drives a camera from device orientation samples.
#[derive(Debug)]
pub struct OrientationController {
    camera: SharedCamera,
    config: OrientationConfig,
    enabled: bool,
    listening: bool,
    sample: DeviceSample,
    screen: ScreenAngle,
    calibration_offset: Option<f32>,
    manual_yaw_offset: f32,
    manual_pitch_offset: f32,
    alpha: f32,
    pending: Option<PermissionRequest>,
    state: ConnectionState,
}

impl OrientationController {
    pub fn new(camera: SharedCamera) -> Self {
        Self::with_config(camera, OrientationConfig::default())
    }

    pub fn with_config(camera: SharedCamera, config: OrientationConfig) -> Self {
        Self {
            camera,
            config,
            enabled: false,
            listening: false,
            sample: DeviceSample::default(),
            screen: ScreenAngle::Portrait,
            calibration_offset: None,
            manual_yaw_offset: 0.0,
            manual_pitch_offset: 0.0,
            alpha: 0.0,
            pending: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn screen_angle(&self) -> ScreenAngle {
        self.screen
    }

    /// Latest calibrated sample.
    pub fn sample(&self) -> DeviceSample {
        self.sample
    }

    /// First alpha ever received, subtracted from every later sample.
    pub fn calibration_offset(&self) -> Option<f32> {
        self.calibration_offset
    }

    /// Yaw applied on the last update, in radians, manual offset included.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn manual_yaw_offset(&self) -> f32 {
        self.manual_yaw_offset
    }

    pub fn manual_pitch_offset(&self) -> f32 {
        self.manual_pitch_offset
    }

    /// Start listening to the platform's sensors, asking for permission first
    /// where the platform requires it.
    pub fn connect(&mut self, platform: &mut dyn SensorPlatform) {
        self.screen = platform.screen_angle();
        if platform.permission_required() {
            self.pending = Some(platform.request_permission());
            self.state = ConnectionState::AwaitingPermission;
            self.poll_permission();
        } else {
            self.listen();
        }
    }

    /// Begin applying samples to the camera.
    pub fn listen(&mut self) {
        self.pending = None;
        self.listening = true;
        self.enabled = true;
        self.state = ConnectionState::Connected;
    }

    /// Check on a pending permission request. Returns true once connected.
    pub fn poll_permission(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return self.state == ConnectionState::Connected;
        };
        let answer = match pending.try_recv() {
            Ok(answer) => answer,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(PermissionError::Dropped),
        };
        self.pending = None;

        match answer {
            Ok(PermissionOutcome::Granted) => {
                debug!("device orientation permission granted");
                self.listen();
                true
            }
            Ok(PermissionOutcome::Denied) => {
                warn!("device orientation permission denied");
                self.refuse();
                false
            }
            Ok(PermissionOutcome::Unavailable) => {
                warn!("device orientation is unavailable on this platform");
                self.refuse();
                false
            }
            Err(err) => {
                error!("{}", err);
                self.refuse();
                false
            }
        }
    }

    fn refuse(&mut self) {
        self.listening = false;
        self.enabled = false;
        self.state = ConnectionState::Refused;
    }

    /// Stop listening. The camera is left where it is.
    pub fn disconnect(&mut self) {
        self.pending = None;
        self.listening = false;
        self.enabled = false;
        self.state = ConnectionState::Disconnected;
    }

    pub fn dispose(&mut self) {
        self.disconnect();
    }

    /// Record a raw sample and, when listening, update the camera.
    pub fn on_device_orientation(&mut self, raw: DeviceSample) {
        if !self.listening {
            return;
        }
        let offset = *self.calibration_offset.get_or_insert(raw.alpha);
        self.sample = DeviceSample {
            alpha: (raw.alpha - offset).rem_euclid(360.0),
            ..raw
        };
        self.update();
    }

    pub fn on_screen_orientation(&mut self, screen: ScreenAngle) {
        if self.listening {
            self.screen = screen;
        }
    }

    /// Turn the view by a drag of `delta` pixels.
    pub fn drag(&mut self, delta: Vec2) {
        let per_pixel = self.config.drag_degrees_per_pixel;
        self.manual_pitch_offset += (-delta.y * per_pixel).to_radians();
        self.set_manual_yaw_offset(self.manual_yaw_offset + (delta.x * per_pixel).to_radians());
    }

    /// Set the yaw added on top of the device heading, in radians.
    pub fn set_manual_yaw_offset(&mut self, angle: f32) {
        self.manual_yaw_offset = angle;
        self.update();
    }

    /// Pick up a pending permission answer, then recompute the camera
    /// rotation from the latest sample.
    pub fn update(&mut self) {
        if self.pending.is_some() {
            self.poll_permission();
        }
        if !self.enabled {
            return;
        }
        let alpha = self.sample.alpha.to_radians() + self.manual_yaw_offset;
        let rotation = compute_rotation(
            alpha,
            self.sample.beta.to_radians(),
            self.sample.gamma.to_radians(),
            self.screen,
            self.manual_pitch_offset,
        );
        self.camera.borrow_mut().rotation = rotation;
        self.alpha = alpha;
    }
}
