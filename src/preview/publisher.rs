use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::camera::backend::FrameConsumer;
use crate::camera::error::CaptureError;
use crate::camera::types::{RawDepthFrame, RawFrame};
use crate::depth::render::ClampedDepthImage;
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::preview::display::{DisplayHandle, DisplayImage, ImageSource};

/// What the display thread should render for one color frame.
///
/// Holds only reference-counted handles so building one on a producer
/// thread costs no pixel copies. Rendering happens on the display thread.
#[derive(Debug, Clone)]
pub enum PreviewSource {
    Color(Arc<RawFrame>),
    /// Depth overlay presented at the color frame's dimensions.
    Depth {
        depth: Arc<ClampedDepthImage>,
        width: u32,
        height: u32,
        timestamp_us: u64,
    },
}

impl PreviewSource {
    /// Pick the depth overlay if one is available, else the color frame.
    pub fn compose(frame: RawFrame, depth: Option<Arc<ClampedDepthImage>>) -> Self {
        match depth {
            Some(depth) => Self::Depth {
                depth,
                width: frame.width,
                height: frame.height,
                timestamp_us: frame.timestamp_us,
            },
            None => Self::Color(Arc::new(frame)),
        }
    }

    pub fn source(&self) -> ImageSource {
        match self {
            Self::Color(_) => ImageSource::Color,
            Self::Depth { .. } => ImageSource::Depth,
        }
    }

    /// Dimensions of the image this source renders to.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Color(frame) => (frame.width, frame.height),
            Self::Depth { width, height, .. } => (*width, *height),
        }
    }

    pub fn render(&self) -> DisplayImage {
        match self {
            Self::Color(frame) => DisplayImage {
                image: bgra_to_rgba(frame),
                source: ImageSource::Color,
                timestamp_us: frame.timestamp_us,
            },
            Self::Depth {
                depth,
                width,
                height,
                timestamp_us,
            } => DisplayImage {
                image: depth.to_rgba_sized(*width, *height),
                source: ImageSource::Depth,
                timestamp_us: *timestamp_us,
            },
        }
    }
}

fn bgra_to_rgba(frame: &RawFrame) -> RgbaImage {
    let pixels = frame.pixels();
    let width = frame.width as usize;
    RgbaImage::from_fn(frame.width, frame.height, |x, y| {
        let [b, g, r, a] = pixels[y as usize * width + x as usize];
        Rgba([r, g, b, a])
    })
}

/// Combines the color and depth streams into the image shown on screen.
///
/// The depth callback replaces the current depth overlay; the color callback
/// reads it and submits one [`PreviewSource`] per color frame. The overlay is
/// a single `Arc` handle swapped under a short lock, so neither callback ever
/// waits on the other or on the display.
pub struct FramePublisher {
    accepting: AtomicBool,
    depth: Mutex<Option<Arc<ClampedDepthImage>>>,
    display: DisplayHandle,
    stats: Mutex<DiagnosticStats>,
}

impl FramePublisher {
    /// Create a publisher feeding `display`. Frames are dropped until
    /// [`resume`](Self::resume) is called.
    pub fn new(display: DisplayHandle) -> Self {
        Self {
            accepting: AtomicBool::new(false),
            depth: Mutex::new(None),
            display,
            stats: Mutex::new(DiagnosticStats::new()),
        }
    }

    /// Start accepting frames and reset diagnostics.
    pub fn resume(&self) {
        self.stats.lock().reset();
        self.accepting.store(true, Ordering::Release);
    }

    /// Stop accepting frames. Callbacks already past the check may still
    /// publish once.
    pub fn halt(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Forget the current depth overlay.
    pub fn clear_depth(&self) {
        self.depth.lock().take();
    }

    /// The most recent clamped depth image, if any.
    pub fn current_depth(&self) -> Option<Arc<ClampedDepthImage>> {
        self.depth.lock().clone()
    }

    pub fn display(&self) -> &DisplayHandle {
        &self.display
    }

    /// Take a serialisable snapshot of this publisher's counters.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot(
            self.display.presented_count(),
            self.display.superseded_count(),
        )
    }
}

impl FrameConsumer for FramePublisher {
    fn on_color_frame(&self, frame: RawFrame) {
        if !self.is_accepting() {
            self.stats.lock().record_drop();
            tracing::trace!("color frame at {}us dropped: not running", frame.timestamp_us);
            return;
        }
        if let Err(e) = frame.check_dimensions() {
            self.on_frame_error(e);
            return;
        }
        self.stats.lock().record_color_frame();
        let depth = self.current_depth();
        self.display.submit(PreviewSource::compose(frame, depth));
    }

    fn on_depth_frame(&self, frame: RawDepthFrame) {
        if !self.is_accepting() {
            self.stats.lock().record_drop();
            tracing::trace!("depth frame at {}us dropped: not running", frame.timestamp_us);
            return;
        }
        if let Err(e) = frame.check_dimensions() {
            self.on_frame_error(e);
            return;
        }
        let image = ClampedDepthImage::from_frame(frame);
        *self.depth.lock() = Some(Arc::new(image));
        self.stats.lock().record_depth_frame();
    }

    fn on_frame_error(&self, error: CaptureError) {
        if error.is_per_frame() {
            tracing::warn!("dropping frame: {error}");
            self.stats.lock().record_extraction_error();
        } else {
            tracing::error!("capture error: {error}");
            self.stats.lock().record_drop();
        }
    }
}
