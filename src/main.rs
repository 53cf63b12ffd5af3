use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use periscope::{
    Camera, Container, DeviceSample, FrameData, FrameEvents, FrameSource, FrameSourceConnector,
    HeadlessBackend, MomentPanorama, OrbitControls, OrientationController, Panorama,
    PanoramaConfig, PanoramaNode, PermissionOutcome, PermissionRequest, ScreenAngle,
    SensorPlatform, Tour, TourError, Vec3,
};

/// Milliseconds per simulated frame.
const FRAME: f32 = 16.0;

/// Frame source that replays a canned decode: first frame, ready, loaded.
struct ScriptedMoment {
    frame_count: u32,
    decoded: bool,
}

impl FrameSource for ScriptedMoment {
    fn render(&mut self, frame_index: u32) {
        info!(frame_index, of = self.frame_count, "moment frame");
    }

    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn texture_ready(&self) -> bool {
        self.decoded
    }

    fn dispose(&mut self) {
        info!("moment source closed");
    }
}

#[derive(Default)]
struct ScriptedConnector {
    sinks: Rc<RefCell<Vec<FrameEvents>>>,
}

impl FrameSourceConnector for ScriptedConnector {
    fn connect(&mut self, identifier: &str, events: FrameEvents) -> Box<dyn FrameSource> {
        info!(identifier, "connecting to moment");
        self.sinks.borrow_mut().push(events);
        Box::new(ScriptedMoment {
            frame_count: 120,
            decoded: true,
        })
    }
}

/// Platform that gates sensors behind a permission prompt the user accepts.
struct PromptingPlatform;

impl SensorPlatform for PromptingPlatform {
    fn screen_angle(&self) -> ScreenAngle {
        ScreenAngle::Portrait
    }

    fn permission_required(&self) -> bool {
        true
    }

    fn request_permission(&mut self) -> PermissionRequest {
        let (tx, rx) = oneshot::channel();
        if tx.send(Ok(PermissionOutcome::Granted)).is_err() {
            warn!("permission answer was dropped");
        }
        rx
    }
}

fn run_frames(tour: &mut Tour, frames: usize) {
    for _ in 0..frames {
        tour.update(FRAME);
    }
}

fn main() -> Result<(), TourError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let backend = HeadlessBackend::new();
    let journal = backend.journal();
    let camera = Camera::new().shared();
    let controls = OrbitControls::new().shared();

    let mut tour = Tour::new(backend);
    tour.set_container(Container::new(1280, 720));
    tour.set_camera(Rc::clone(&camera));
    tour.set_controls(Rc::clone(&controls));

    let config = PanoramaConfig::new().animation_duration(400.0);
    let mut lobby = Panorama::new(config.clone());
    lobby
        .bus_mut()
        .on_any(|event| info!(event = event.name(), "lobby"));

    let connector = ScriptedConnector::default();
    let sinks = Rc::clone(&connector.sinks);
    let mut moment = MomentPanorama::with_config("demo-moment", Box::new(connector), config);
    moment
        .panorama_mut()
        .bus_mut()
        .on_any(|event| info!(event = event.name(), "moment"));

    let lobby = tour.add(lobby);
    let moment = tour.add(moment);
    tour.link(lobby, moment, Some(Vec3::new(0.0, 0.0, -5000.0)), None, None)?;
    tour.link(moment, lobby, Some(Vec3::new(0.0, 0.0, 5000.0)), None, None)?;

    tour.set_panorama(lobby)?;
    run_frames(&mut tour, 40);

    info!("walking through the lobby hotspot");
    tour.activate_hotspot(lobby, 0)?;
    run_frames(&mut tour, 5);

    // Replay the decoder: first frame, then scrubbable, then fully decoded.
    let data = FrameData {
        frame_count: 120,
        clockwise: true,
        start_frame: 45.0,
    };
    for events in sinks.borrow().iter() {
        events.render(data);
        events.render(data);
    }
    run_frames(&mut tour, 5);
    for events in sinks.borrow().iter() {
        events.ready();
    }
    run_frames(&mut tour, 40);

    controls.borrow_mut().rotate_left(0.5);
    run_frames(&mut tour, 2);
    for events in sinks.borrow().iter() {
        events.loaded();
    }
    run_frames(&mut tour, 2);
    info!(yaw = camera.borrow().yaw_degrees(), "camera after scrubbing");

    info!("switching to device orientation");
    controls.borrow_mut().enabled = false;
    let mut orientation = OrientationController::new(Rc::clone(&camera));
    orientation.connect(&mut PromptingPlatform);
    for step in 0..4 {
        let sample = DeviceSample::new(30.0 * step as f32, 90.0, 0.0);
        orientation.on_device_orientation(sample);
        tour.update(FRAME);
        info!(
            alpha = orientation.sample().alpha,
            forward = ?camera.borrow().forward(),
            "orientation sample"
        );
    }
    orientation.dispose();

    info!("back to the lobby");
    tour.activate_hotspot(moment, 0)?;
    run_frames(&mut tour, 60);

    tour.clear();
    info!(
        operations = journal.borrow().len(),
        remaining = tour.len(),
        "tour disposed"
    );
    Ok(())
}
