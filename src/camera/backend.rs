use std::sync::Arc;

use crate::camera::error::{CaptureError, Result};
use crate::camera::types::{CaptureConfig, RawDepthFrame, RawFrame};

/// Receiver side of a capture backend's two frame streams.
///
/// The color and depth callbacks are invoked from the backend's own producer
/// threads, concurrently and in no particular order relative to each other.
/// Implementations must return quickly and never block on the display.
pub trait FrameConsumer: Send + Sync {
    /// A color frame was captured.
    fn on_color_frame(&self, frame: RawFrame);

    /// A depth frame was captured.
    fn on_depth_frame(&self, frame: RawDepthFrame);

    /// A frame was delivered without usable data. Only that frame is lost.
    fn on_frame_error(&self, error: CaptureError);
}

/// Platform-agnostic capture backend trait.
///
/// Implemented per platform on top of the native capture API. A backend owns
/// the device session and the producer threads that feed a [`FrameConsumer`].
pub trait CaptureBackend: Send + Sync {
    /// Configure the device and begin delivering frames to `consumer`.
    ///
    /// Errors are terminal for this configuration attempt: no frames will be
    /// delivered and nothing needs to be stopped.
    fn start(&self, config: &CaptureConfig, consumer: Arc<dyn FrameConsumer>) -> Result<()>;

    /// Halt frame delivery and release the consumer.
    ///
    /// Once this returns no further callbacks are made. Idempotent.
    fn stop(&self);

    /// Whether frames are currently being delivered.
    fn is_running(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Mock backend that forwards a single color frame on start.
    struct MockBackend {
        consumer: Mutex<Option<Arc<dyn FrameConsumer>>>,
        running: AtomicBool,
    }

    impl CaptureBackend for MockBackend {
        fn start(&self, config: &CaptureConfig, consumer: Arc<dyn FrameConsumer>) -> Result<()> {
            config.validate()?;
            let frame = RawFrame {
                data: vec![0; 4],
                width: 1,
                height: 1,
                timestamp_us: 0,
            };
            consumer.on_color_frame(frame);
            *self.consumer.lock() = Some(consumer);
            self.running.store(true, Ordering::Relaxed);
            Ok(())
        }

        fn stop(&self) {
            self.running.store(false, Ordering::Relaxed);
            self.consumer.lock().take();
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::Relaxed)
        }
    }

    #[derive(Default)]
    struct CountingConsumer {
        color: Mutex<usize>,
        depth: Mutex<usize>,
        errors: Mutex<usize>,
    }

    impl FrameConsumer for CountingConsumer {
        fn on_color_frame(&self, _frame: RawFrame) {
            *self.color.lock() += 1;
        }

        fn on_depth_frame(&self, _frame: RawDepthFrame) {
            *self.depth.lock() += 1;
        }

        fn on_frame_error(&self, _error: CaptureError) {
            *self.errors.lock() += 1;
        }
    }

    fn mock_backend() -> MockBackend {
        MockBackend {
            consumer: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    #[test]
    fn mock_backend_delivers_to_consumer() {
        let backend = mock_backend();
        let consumer = Arc::new(CountingConsumer::default());
        backend
            .start(&CaptureConfig::default(), consumer.clone())
            .unwrap();
        assert!(backend.is_running());
        assert_eq!(*consumer.color.lock(), 1);
        assert_eq!(*consumer.depth.lock(), 0);
    }

    #[test]
    fn mock_backend_stop_releases_consumer() {
        let backend = mock_backend();
        let consumer = Arc::new(CountingConsumer::default());
        backend
            .start(&CaptureConfig::default(), consumer.clone())
            .unwrap();
        backend.stop();
        backend.stop();
        assert!(!backend.is_running());
        assert_eq!(Arc::strong_count(&consumer), 1);
    }

    #[test]
    fn invalid_config_fails_start() {
        let backend = mock_backend();
        let config = CaptureConfig {
            color_width: 0,
            ..CaptureConfig::default()
        };
        let result = backend.start(&config, Arc::new(CountingConsumer::default()));
        assert!(matches!(result, Err(CaptureError::Configuration(_))));
        assert!(!backend.is_running());
    }

    #[test]
    fn trait_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn CaptureBackend>>();
        assert_send_sync::<Arc<dyn FrameConsumer>>();
    }
}
