use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use depth_preview_lib::camera::backend::FrameConsumer;
use depth_preview_lib::camera::dummy::DummyBackend;
use depth_preview_lib::camera::types::{CaptureConfig, DepthEncoding, RawFrame};
use depth_preview_lib::preview::capture::{CaptureSession, SessionState};
use depth_preview_lib::preview::display::{DisplayImage, ImageSource};

fn config() -> CaptureConfig {
    CaptureConfig {
        color_width: 16,
        color_height: 12,
        depth_width: 8,
        depth_height: 6,
        color_fps: 200.0,
        depth_fps: 100.0,
        depth_filtering: false,
        match_depth_frame_rate: false,
    }
}

fn recording_session(backend: DummyBackend) -> (CaptureSession, Arc<Mutex<Vec<DisplayImage>>>) {
    let images = Arc::new(Mutex::new(Vec::new()));
    let sink_images = Arc::clone(&images);
    let session = CaptureSession::new(Box::new(backend), config(), move |image: DisplayImage| {
        sink_images.lock().push(image);
    })
    .unwrap();
    (session, images)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn has_depth_image(images: &Mutex<Vec<DisplayImage>>) -> bool {
    images.lock().iter().any(|i| i.source == ImageSource::Depth)
}

#[test]
fn depth_overlay_is_presented_at_color_resolution() {
    let (session, images) = recording_session(DummyBackend::new());
    session.configure().unwrap();
    assert!(wait_until(|| has_depth_image(&images)));
    session.stop();

    let images = images.lock();
    assert!(images.iter().all(|i| i.width() == 16 && i.height() == 12));

    let depth = images
        .iter()
        .find(|i| i.source == ImageSource::Depth)
        .unwrap();
    // Ramp starts below zero (black) and ends above one (white).
    assert_eq!(depth.image.get_pixel(0, 0)[0], 0);
    assert_eq!(depth.image.get_pixel(15, 0)[0], 255);
    // Unfiltered depth has an invalid hole in the middle, rendered black.
    assert_eq!(depth.image.get_pixel(8, 6)[0], 0);
    assert!(depth.image.pixels().all(|p| p[3] == 255));
}

#[test]
fn distance_encoded_depth_is_presented() {
    let backend = DummyBackend::new().with_depth_encoding(DepthEncoding::Depth);
    let (session, images) = recording_session(backend);
    session.configure().unwrap();
    assert!(wait_until(|| has_depth_image(&images)));

    let depth = session.publisher().current_depth().unwrap();
    assert!(depth
        .samples()
        .iter()
        .all(|v| v.is_nan() || (0.0..=1.0).contains(v)));
    session.stop();
}

#[test]
fn extraction_failures_do_not_halt_the_stream() {
    let backend = DummyBackend::new().with_depth_failures_every(2);
    let (session, images) = recording_session(backend);
    session.configure().unwrap();

    assert!(wait_until(|| {
        let snap = session.diagnostics();
        snap.extraction_errors >= 3 && snap.depth_frames >= 3
    }));
    assert!(session.is_running());
    assert!(has_depth_image(&images));
    session.stop();
}

#[test]
fn malformed_color_frame_does_not_halt_presentation() {
    let (session, images) = recording_session(DummyBackend::new());
    session.configure().unwrap();
    assert!(wait_until(|| !images.lock().is_empty()));

    session.publisher().on_color_frame(RawFrame {
        data: vec![0; 10],
        width: 16,
        height: 12,
        timestamp_us: 0,
    });
    let seen = images.lock().len();
    assert!(wait_until(|| images.lock().len() >= seen + 3));
    assert!(session.diagnostics().extraction_errors >= 1);
    session.stop();
}

#[test]
fn stop_halts_presentation() {
    let (session, images) = recording_session(DummyBackend::new());
    session.configure().unwrap();
    assert!(wait_until(|| images.lock().len() >= 5));

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.publisher().current_depth().is_none());

    // At most one stale image may still be in flight after stop.
    std::thread::sleep(Duration::from_millis(30));
    let settled = images.lock().len();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(images.lock().len(), settled);
}

#[test]
fn unavailable_camera_never_presents() {
    let (session, images) = recording_session(DummyBackend::unavailable());
    assert!(session.configure().is_err());
    std::thread::sleep(Duration::from_millis(30));
    assert!(images.lock().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}
