pub mod camera;
pub mod depth;
pub mod diagnostics;
pub mod preview;
pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use camera::backend::{CaptureBackend, FrameConsumer};
use camera::dummy::DummyBackend;
use camera::error::{CaptureError, Result};
use camera::types::CaptureConfig;
use preview::capture::CaptureSession;
use preview::display::DisplayImage;
use settings::store::SettingsStore;
use settings::types::PreviewSettings;

/// Default location of the settings file when `DEPTH_PREVIEW_SETTINGS` is unset.
const DEFAULT_SETTINGS_FILE: &str = "depth-preview.json";

/// How long `run()` previews for when `DEPTH_PREVIEW_SECONDS` is unset.
const DEFAULT_RUN_SECONDS: u64 = 5;

/// Backend used when no capture hardware is present. Configuration always
/// fails, so the preview never starts.
struct NullBackend;

impl CaptureBackend for NullBackend {
    fn start(&self, _config: &CaptureConfig, _consumer: Arc<dyn FrameConsumer>) -> Result<()> {
        Err(CaptureError::Configuration(
            "no depth camera available".to_string(),
        ))
    }

    fn stop(&self) {}

    fn is_running(&self) -> bool {
        false
    }
}

/// Create the capture backend for the current environment.
///
/// When `DUMMY_CAMERA=1` is set (or the settings ask for it), a simulated
/// camera is used instead.
fn create_backend(settings: &PreviewSettings) -> Box<dyn CaptureBackend> {
    if settings.dummy_camera || DummyBackend::is_enabled() {
        return Box::new(DummyBackend::new());
    }
    Box::new(NullBackend)
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Calling this more than once is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("depth_preview_lib=info,depth_preview=info")
            }),
        )
        .with_target(true)
        .try_init();
}

fn settings_path() -> PathBuf {
    std::env::var_os("DEPTH_PREVIEW_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

fn run_duration() -> Duration {
    let seconds = std::env::var("DEPTH_PREVIEW_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RUN_SECONDS);
    Duration::from_secs(seconds)
}

/// Run a preview session for a fixed time, logging what reaches the display.
pub fn run() -> Result<()> {
    init_logging();

    let store = SettingsStore::new(settings_path());
    match store.persist_if_missing() {
        Ok(true) => tracing::info!("wrote default settings to {}", store.path().display()),
        Ok(false) => tracing::info!("using settings from {}", store.path().display()),
        Err(e) => tracing::warn!("failed to write default settings: {e}"),
    }
    let settings = store.get();

    let mut presented: u64 = 0;
    let sink = move |image: DisplayImage| {
        presented += 1;
        if presented % 30 == 1 {
            tracing::debug!(
                "presented {:?} image {}x{} at {}us",
                image.source,
                image.width(),
                image.height(),
                image.timestamp_us
            );
        }
    };

    let session = CaptureSession::new(create_backend(&settings), settings.capture, sink)?;
    session.configure()?;
    std::thread::sleep(run_duration());
    session.stop();

    let snapshot = session.diagnostics();
    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::info!("session diagnostics: {json}"),
        Err(e) => tracing::warn!("failed to serialise diagnostics: {e}"),
    }
    Ok(())
}
