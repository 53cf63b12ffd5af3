//! Late-bound viewer context injected into panoramas after construction.
//!
//! The viewer owns the container, camera and controls. Nodes are built
//! without them and receive them later through their `set_*` methods, which
//! store the reference here and announce it on the node's event bus.

use crate::camera::SharedCamera;
use crate::controls::SharedControls;

/// The viewer surface a panorama is displayed in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub width: u32,
    pub height: u32,
}

impl Container {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Image quality tier appropriate for this container's width.
    pub fn image_quality(&self) -> ImageQuality {
        match self.width {
            0..=800 => ImageQuality::Fair,
            801..=1280 => ImageQuality::Medium,
            1281..=1920 => ImageQuality::High,
            _ => ImageQuality::SuperHigh,
        }
    }
}

/// Image quality tiers used to pick a texture resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageQuality {
    Low = 1,
    Fair = 2,
    Medium = 3,
    High = 4,
    SuperHigh = 5,
}

/// Context references a node has received so far.
#[derive(Clone, Debug, Default)]
pub struct NodeContext {
    pub container: Option<Container>,
    pub camera: Option<SharedCamera>,
    pub controls: Option<SharedControls>,
}

impl NodeContext {
    /// Image quality for the current container, or [`ImageQuality::Low`] when
    /// no container has been delivered yet.
    pub fn image_quality(&self) -> ImageQuality {
        self.container
            .as_ref()
            .map_or(ImageQuality::Low, Container::image_quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_tiers_follow_width() {
        assert_eq!(Container::new(800, 600).image_quality(), ImageQuality::Fair);
        assert_eq!(Container::new(801, 600).image_quality(), ImageQuality::Medium);
        assert_eq!(Container::new(1920, 1080).image_quality(), ImageQuality::High);
        assert_eq!(Container::new(2560, 1440).image_quality(), ImageQuality::SuperHigh);
    }

    #[test]
    fn missing_container_is_low_quality() {
        assert_eq!(NodeContext::default().image_quality(), ImageQuality::Low);
    }
}
