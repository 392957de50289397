//! Display hand-off: a single dedicated thread owns the UI sink.
//!
//! Producers never touch the sink. They drop a [`PreviewSource`] into a
//! one-element slot and return; the display thread wakes, renders the most
//! recent source and presents it. A submission that arrives before the
//! previous one was rendered replaces it, so there is never a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use image::RgbaImage;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::camera::error::{CaptureError, Result};
use crate::preview::publisher::PreviewSource;

/// Which stream a presented image was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Color,
    Depth,
}

/// A rendered, presentable RGBA image.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pub image: RgbaImage,
    pub source: ImageSource,
    /// Timestamp of the color frame that triggered the publish.
    pub timestamp_us: u64,
}

impl DisplayImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// The UI surface images are presented to.
///
/// Only ever called from the display thread.
pub trait DisplaySink: Send + 'static {
    fn present(&mut self, image: DisplayImage);
}

impl<F> DisplaySink for F
where
    F: FnMut(DisplayImage) + Send + 'static,
{
    fn present(&mut self, image: DisplayImage) {
        self(image)
    }
}

struct Slot {
    pending: Option<PreviewSource>,
    shutdown: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
    presented: AtomicU64,
    superseded: AtomicU64,
}

/// Cheap, cloneable submitter for the display thread.
#[derive(Clone)]
pub struct DisplayHandle {
    shared: Arc<Shared>,
}

impl DisplayHandle {
    /// Queue `source` for presentation and return immediately.
    ///
    /// Returns `true` if an older, not yet rendered source was replaced.
    /// Submissions after shutdown are discarded.
    pub fn submit(&self, source: PreviewSource) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.shutdown {
            return false;
        }
        let replaced = slot.pending.replace(source).is_some();
        drop(slot);
        if replaced {
            self.shared.superseded.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.ready.notify_one();
        replaced
    }

    /// Number of images handed to the sink so far.
    pub fn presented_count(&self) -> u64 {
        self.shared.presented.load(Ordering::Relaxed)
    }

    /// Number of submissions replaced before they were rendered.
    pub fn superseded_count(&self) -> u64 {
        self.shared.superseded.load(Ordering::Relaxed)
    }
}

/// The dedicated display thread.
pub struct DisplayThread {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl DisplayThread {
    /// Spawn the display thread, which takes ownership of `sink`.
    pub fn spawn<S: DisplaySink>(sink: S) -> Result<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                pending: None,
                shutdown: false,
            }),
            ready: Condvar::new(),
            presented: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
        });

        let thread = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("display".to_string())
                .spawn(move || run_display_loop(&shared, sink))
                .map_err(|e| CaptureError::ThreadSpawn("display", e))?
        };

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> DisplayHandle {
        DisplayHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop the display thread, discarding any unrendered submission.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut slot = self.shared.slot.lock();
            slot.shutdown = true;
            slot.pending = None;
        }
        self.shared.ready.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DisplayThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_display_loop<S: DisplaySink>(shared: &Shared, mut sink: S) {
    tracing::debug!("display thread started");
    loop {
        let source = {
            let mut slot = shared.slot.lock();
            while slot.pending.is_none() && !slot.shutdown {
                shared.ready.wait(&mut slot);
            }
            if slot.shutdown {
                break;
            }
            slot.pending.take()
        };

        if let Some(source) = source {
            sink.present(source.render());
            shared.presented.fetch_add(1, Ordering::Relaxed);
        }
    }
    tracing::debug!("display thread exiting");
}
