//! Integration tests for a tour mixing still and moment panoramas.

use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

use approx::assert_relative_eq;
use periscope::{
    Camera, Event, EventKind, FrameData, FrameEvents, FrameSource, FrameSourceConnector,
    HeadlessBackend, MomentPanorama, MomentStatus, OrbitControls, Panorama, PanoramaConfig,
    PanoramaId, PanoramaNode, RenderOp, SharedCamera, SharedControls, Tour, Vec3,
};

#[derive(Default)]
struct Recorder {
    sinks: Vec<FrameEvents>,
    rendered: Vec<u32>,
    disposed: bool,
}

struct Connector(Rc<RefCell<Recorder>>);

struct Source(Rc<RefCell<Recorder>>);

impl FrameSourceConnector for Connector {
    fn connect(&mut self, _identifier: &str, events: FrameEvents) -> Box<dyn FrameSource> {
        self.0.borrow_mut().sinks.push(events);
        Box::new(Source(Rc::clone(&self.0)))
    }
}

impl FrameSource for Source {
    fn render(&mut self, frame_index: u32) {
        self.0.borrow_mut().rendered.push(frame_index);
    }

    fn frame_count(&self) -> u32 {
        100
    }

    fn texture_ready(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.0.borrow_mut().disposed = true;
    }
}

struct Fixture {
    tour: Tour,
    lobby: PanoramaId,
    moment: PanoramaId,
    recorder: Rc<RefCell<Recorder>>,
    camera: SharedCamera,
    controls: SharedControls,
    journal: Rc<RefCell<Vec<RenderOp>>>,
}

fn fixture() -> Fixture {
    let backend = HeadlessBackend::new();
    let journal = backend.journal();
    let camera = Camera::new().with_fov(70.0).shared();
    let controls = OrbitControls::new().polar_limits(0.2, 2.9).shared();
    let recorder = Rc::new(RefCell::new(Recorder::default()));

    let config = PanoramaConfig::new().animation_duration(100.0);
    let mut tour = Tour::new(backend);
    tour.set_camera(Rc::clone(&camera));
    tour.set_controls(Rc::clone(&controls));

    let lobby = tour.add(Panorama::new(config.clone()));
    let moment = tour.add(MomentPanorama::with_config(
        "moment",
        Box::new(Connector(Rc::clone(&recorder))),
        config,
    ));
    tour.link(lobby, moment, Some(Vec3::NEG_Z), None, None).unwrap();
    tour.link(moment, lobby, Some(Vec3::Z), None, None).unwrap();

    Fixture {
        tour,
        lobby,
        moment,
        recorder,
        camera,
        controls,
        journal,
    }
}

fn settle(tour: &mut Tour) {
    for _ in 0..10 {
        tour.update(50.0);
    }
}

fn sink(recorder: &Rc<RefCell<Recorder>>) -> FrameEvents {
    recorder.borrow().sinks[0].clone()
}

/// Walk from the lobby into the moment and let it decode.
fn enter_moment(f: &mut Fixture) {
    f.tour.set_panorama(f.lobby).unwrap();
    settle(&mut f.tour);
    f.tour.activate_hotspot(f.lobby, 0).unwrap();
    f.tour.update(0.0);

    let events = sink(&f.recorder);
    events.render(FrameData {
        frame_count: 100,
        clockwise: true,
        start_frame: 0.0,
    });
    events.ready();
    f.tour.update(0.0);
}

#[test]
fn still_panorama_fades_in_and_shows_hotspots() {
    let mut f = fixture();
    f.tour.set_panorama(f.lobby).unwrap();
    settle(&mut f.tour);

    let lobby = f.tour.panorama(f.lobby).unwrap();
    assert!(lobby.is_loaded());
    assert_eq!(lobby.opacity(), 1.0);
    assert!(lobby.hotspots()[0].is_visible());
}

#[test]
fn moment_connects_lazily_and_disables_controls_while_loading() {
    let mut f = fixture();
    f.tour.set_panorama(f.lobby).unwrap();
    settle(&mut f.tour);
    assert!(f.recorder.borrow().sinks.is_empty());

    f.tour.activate_hotspot(f.lobby, 0).unwrap();
    f.tour.update(0.0);
    assert_eq!(f.recorder.borrow().sinks.len(), 1);
    assert!(!f.controls.borrow().enabled);
    assert!(f.tour.panorama(f.lobby).unwrap().is_active());
}

#[test]
fn moment_faces_start_frame_and_scrubs_with_camera() {
    let mut f = fixture();
    enter_moment(&mut f);

    assert!(f.controls.borrow().enabled);
    assert!(f.tour.is_ticking(f.moment));
    assert_relative_eq!(f.controls.borrow().azimuth, PI);

    // The controls turn the camera half way round on the next update.
    f.tour.update(0.0);
    assert_eq!(f.recorder.borrow().rendered.last(), Some(&25));

    let texture = f.tour.panorama(f.moment).unwrap().texture().unwrap();
    assert!(f.journal.borrow().contains(&RenderOp::MarkDirty(texture)));
}

#[test]
fn lobby_is_left_once_moment_fades_in() {
    let mut f = fixture();
    enter_moment(&mut f);
    settle(&mut f.tour);

    assert!(!f.tour.panorama(f.lobby).unwrap().is_active());
    assert!(!f.tour.panorama(f.lobby).unwrap().is_visible());
    assert!(f.tour.panorama(f.moment).unwrap().is_visible());
}

#[test]
fn leaving_moment_restores_camera_and_controls() {
    let mut f = fixture();
    enter_moment(&mut f);
    settle(&mut f.tour);

    f.camera.borrow_mut().fov = 30.0;
    f.controls.borrow_mut().min_polar_angle = 1.0;
    f.controls.borrow_mut().max_polar_angle = 2.0;

    f.tour.activate_hotspot(f.moment, 0).unwrap();
    settle(&mut f.tour);

    assert_eq!(f.tour.current(), Some(f.lobby));
    assert_eq!(f.camera.borrow().fov, 70.0);
    assert_relative_eq!(f.controls.borrow().min_polar_angle, 0.2);
    assert_relative_eq!(f.controls.borrow().max_polar_angle, 2.9);
    assert!(!f.tour.is_ticking(f.moment));

    let rendered = f.recorder.borrow().rendered.len();
    settle(&mut f.tour);
    assert_eq!(f.recorder.borrow().rendered.len(), rendered);
}

#[test]
fn moment_status_events_reach_listeners() {
    let mut f = fixture();
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&statuses);
    f.tour
        .get_mut(f.moment)
        .unwrap()
        .panorama_mut()
        .bus_mut()
        .on_any(move |event| {
            if let Event::Moment(status) = event {
                log.borrow_mut().push(*status);
            }
        });

    enter_moment(&mut f);
    sink(&f.recorder).loaded();
    f.tour.update(0.0);

    assert_eq!(
        *statuses.borrow(),
        vec![
            MomentStatus::FirstFrameDecoded,
            MomentStatus::Ready,
            MomentStatus::Completed
        ]
    );
}

#[test]
fn disposing_moment_closes_source_and_strands_edges() {
    let mut f = fixture();
    enter_moment(&mut f);
    settle(&mut f.tour);
    f.tour.activate_hotspot(f.moment, 0).unwrap();
    settle(&mut f.tour);

    let listeners = f
        .tour
        .panorama(f.moment)
        .unwrap()
        .bus()
        .listener_count(EventKind::Ready);
    assert!(listeners > 0);

    f.tour.dispose(f.moment).unwrap();
    assert!(f.recorder.borrow().disposed);
    assert!(f.tour.neighbors(f.lobby).is_empty());
    assert!(f.tour.get(f.moment).is_none());

    f.tour.activate_hotspot(f.lobby, 0).unwrap();
    assert_eq!(f.tour.current(), Some(f.lobby));
}
