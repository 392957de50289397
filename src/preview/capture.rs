use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::camera::backend::{CaptureBackend, FrameConsumer};
use crate::camera::error::Result;
use crate::camera::types::CaptureConfig;
use crate::diagnostics::stats::DiagnosticSnapshot;
use crate::preview::display::{DisplaySink, DisplayThread};
use crate::preview::publisher::FramePublisher;

/// Lifecycle of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

/// One capture pipeline: a backend, the publisher it feeds and the display
/// thread the publisher hands images to.
///
/// Sessions are plain values. Several can exist at once, each with its own
/// backend and sink.
pub struct CaptureSession {
    config: CaptureConfig,
    backend: Box<dyn CaptureBackend>,
    publisher: Arc<FramePublisher>,
    display: DisplayThread,
    state: AtomicU8,
    /// Serialises `configure` and `stop` against each other.
    transition: Mutex<()>,
}

impl CaptureSession {
    /// Create an idle session. Spawns the display thread, which owns `sink`
    /// for the lifetime of the session.
    pub fn new<S: DisplaySink>(
        backend: Box<dyn CaptureBackend>,
        config: CaptureConfig,
        sink: S,
    ) -> Result<Self> {
        let display = DisplayThread::spawn(sink)?;
        let publisher = Arc::new(FramePublisher::new(display.handle()));
        Ok(Self {
            config,
            backend,
            publisher,
            display,
            state: AtomicU8::new(SessionState::Idle as u8),
            transition: Mutex::new(()),
        })
    }

    /// Configure the capture device and start frame delivery.
    ///
    /// A no-op if the session is already running. Configuration failures
    /// leave the session idle and are not retried.
    pub fn configure(&self) -> Result<()> {
        let _guard = self.transition.lock();
        if self.state() == SessionState::Running {
            return Ok(());
        }

        self.publisher.resume();
        let consumer: Arc<dyn FrameConsumer> = self.publisher.clone();
        if let Err(e) = self.backend.start(&self.config, consumer) {
            self.publisher.halt();
            error!("capture configuration failed: {e}");
            return Err(e);
        }

        self.set_state(SessionState::Running);
        info!(
            "capture session running: color {}x{}, depth {}x{}",
            self.config.color_width,
            self.config.color_height,
            self.config.depth_width,
            self.config.depth_height
        );
        Ok(())
    }

    /// Halt frame delivery and forget the current depth overlay.
    ///
    /// Frames arriving while stopping are dropped. Idempotent, and a no-op on
    /// a session that was never configured.
    pub fn stop(&self) {
        let _guard = self.transition.lock();
        if self.state() != SessionState::Running {
            return;
        }

        self.set_state(SessionState::Stopping);
        self.publisher.halt();
        self.backend.stop();
        self.publisher.clear_depth();
        self.set_state(SessionState::Idle);
        info!("capture session stopped");
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Check if the capture session is currently running.
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The publisher receiving this session's frames.
    pub fn publisher(&self) -> &Arc<FramePublisher> {
        &self.publisher
    }

    /// Take a snapshot of diagnostic stats for this session.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.publisher.diagnostics()
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
        self.display.shutdown();
    }
}
