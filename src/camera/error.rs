use thiserror::Error;

/// Capture subsystem errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture pipeline could not be set up. Terminal for `configure()`.
    #[error("capture configuration failed: {0}")]
    Configuration(String),

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A delivered frame lacked the data it was expected to carry.
    /// Only that frame is dropped.
    #[error("frame extraction failed: {0}")]
    FrameExtraction(String),

    #[error("failed to spawn {0} thread: {1}")]
    ThreadSpawn(&'static str, std::io::Error),
}

impl CaptureError {
    /// Whether the error only affects a single frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::FrameExtraction(_))
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
