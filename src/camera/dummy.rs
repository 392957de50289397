use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::camera::backend::{CaptureBackend, FrameConsumer};
use crate::camera::error::{CaptureError, Result};
use crate::camera::types::{CaptureConfig, DepthEncoding, RawDepthFrame, RawFrame};

/// Disparity at the left edge of the synthetic depth ramp.
const RAMP_START: f32 = -0.25;
/// Disparity at the right edge of the synthetic depth ramp.
const RAMP_END: f32 = 1.5;

/// Synthetic BGRA gradient that scrolls horizontally with `seq`.
pub fn test_color_frame(width: u32, height: u32, seq: u64, timestamp_us: u64) -> RawFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as u64 + seq) % 256) as u8;
            let g = (y % 256) as u8;
            data.extend_from_slice(&[128, g, r, 255]);
        }
    }
    RawFrame {
        data,
        width,
        height,
        timestamp_us,
    }
}

/// Synthetic depth frame: a left-to-right disparity ramp from below 0 to above 1,
/// with a NaN hole in the middle unless `filtered`.
pub fn test_depth_frame(
    width: u32,
    height: u32,
    timestamp_us: u64,
    encoding: DepthEncoding,
    filtered: bool,
) -> RawDepthFrame {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let hole_radius = width.min(height) as f32 / 8.0;
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let t = if width > 1 {
                x as f32 / (width - 1) as f32
            } else {
                0.0
            };
            let disparity = RAMP_START + (RAMP_END - RAMP_START) * t;
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            let sample = if !filtered && (dx * dx + dy * dy).sqrt() < hole_radius {
                f32::NAN
            } else {
                match encoding {
                    DepthEncoding::Disparity => disparity,
                    DepthEncoding::Depth => disparity.recip(),
                }
            };
            data.push(sample);
        }
    }
    RawDepthFrame {
        data,
        width,
        height,
        timestamp_us,
        encoding,
    }
}

/// A fake two-stream depth camera for testing without real hardware.
///
/// Spawns one producer thread per stream that delivers synthetic frames at
/// the configured rates. Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummyBackend {
    available: bool,
    depth_encoding: DepthEncoding,
    /// Replace every n-th depth frame with an extraction error.
    fail_depth_every: Option<u64>,
    running: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl DummyBackend {
    /// Create a backend delivering disparity-encoded depth.
    pub fn new() -> Self {
        Self::with_availability(true)
    }

    /// A backend whose device is missing. `start` always fails.
    pub fn unavailable() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            available,
            depth_encoding: DepthEncoding::Disparity,
            fail_depth_every: None,
            running: Arc::new(AtomicBool::new(false)),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Deliver depth in the given encoding instead of disparity.
    pub fn with_depth_encoding(mut self, encoding: DepthEncoding) -> Self {
        self.depth_encoding = encoding;
        self
    }

    /// Drop every `n`-th depth frame with a `FrameExtraction` error.
    pub fn with_depth_failures_every(mut self, n: u64) -> Self {
        self.fail_depth_every = Some(n.max(1));
        self
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    fn spawn_producer<F>(
        &self,
        name: &'static str,
        interval: Duration,
        mut produce: F,
    ) -> Result<JoinHandle<()>>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        std::thread::Builder::new()
            .name(format!("dummy-{name}"))
            .spawn(move || {
                let mut seq = 0;
                while running.load(Ordering::Acquire) {
                    produce(seq);
                    seq += 1;
                    std::thread::sleep(interval);
                }
                tracing::debug!("dummy {name} producer exiting after {seq} frames");
            })
            .map_err(|e| CaptureError::ThreadSpawn(name, e))
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for DummyBackend {
    fn start(&self, config: &CaptureConfig, consumer: Arc<dyn FrameConsumer>) -> Result<()> {
        if !self.available {
            return Err(CaptureError::Configuration(
                "no depth camera available".to_string(),
            ));
        }
        config.validate()?;
        let color_interval = config.color_interval()?;
        let depth_interval = config.depth_interval()?;
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let epoch = Instant::now();

        let color = {
            let consumer = Arc::clone(&consumer);
            let (width, height) = (config.color_width, config.color_height);
            self.spawn_producer("color", color_interval, move |seq| {
                let ts = epoch.elapsed().as_micros() as u64;
                consumer.on_color_frame(test_color_frame(width, height, seq, ts));
            })
        };
        let color = match color {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };
        self.threads.lock().push(color);

        let depth = {
            let (width, height) = (config.depth_width, config.depth_height);
            let filtered = config.depth_filtering;
            let encoding = self.depth_encoding;
            let fail_every = self.fail_depth_every;
            self.spawn_producer("depth", depth_interval, move |seq| {
                if fail_every.is_some_and(|n| (seq + 1) % n == 0) {
                    consumer.on_frame_error(CaptureError::FrameExtraction(format!(
                        "depth data missing from frame {seq}"
                    )));
                    return;
                }
                let ts = epoch.elapsed().as_micros() as u64;
                consumer.on_depth_frame(test_depth_frame(width, height, ts, encoding, filtered));
            })
        };
        match depth {
            Ok(handle) => self.threads.lock().push(handle),
            Err(e) => {
                self.stop();
                return Err(e);
            }
        }

        tracing::info!(
            "dummy capture started: color {}x{} @ {:.1}fps, depth {}x{} @ {:.1}fps",
            config.color_width,
            config.color_height,
            config.effective_color_fps(),
            config.depth_width,
            config.depth_height,
            config.depth_fps
        );
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let handles = std::mem::take(&mut *self.threads.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for DummyBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
