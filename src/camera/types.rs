use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::camera::error::{CaptureError, Result};

/// How a depth sensor encodes distance-from-camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthEncoding {
    /// Inverse depth (1/metres). Larger values are closer.
    Disparity,
    /// Distance in metres.
    Depth,
}

impl fmt::Display for DepthEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disparity => write!(f, "disparity"),
            Self::Depth => write!(f, "depth"),
        }
    }
}

/// Number of bytes needed for `width * height` samples of `bytes_per_sample`.
fn expected_len(width: u32, height: u32, bytes_per_sample: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(bytes_per_sample)
}

/// A single color frame from the camera, 32-bit BGRA.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Pixel data, 4 bytes per pixel in B, G, R, A order, row-major.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

impl RawFrame {
    /// Wrap a BGRA buffer, checking it covers exactly `width * height` pixels.
    pub fn from_bgra_bytes(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_us: u64,
    ) -> Result<Self> {
        let frame = Self {
            data,
            width,
            height,
            timestamp_us,
        };
        frame.check_dimensions()?;
        Ok(frame)
    }

    /// Check the buffer covers exactly `width * height` BGRA pixels.
    pub fn check_dimensions(&self) -> Result<()> {
        match expected_len(self.width, self.height, 4) {
            Some(len) if len == self.data.len() => Ok(()),
            _ => Err(CaptureError::FrameExtraction(format!(
                "color buffer of {} bytes does not match {}x{} BGRA",
                self.data.len(),
                self.width,
                self.height
            ))),
        }
    }

    /// View the buffer as BGRA pixels.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(self.data.as_slice())
    }
}

/// A single depth frame: one 32-bit float per sample, row-major, no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDepthFrame {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
    pub encoding: DepthEncoding,
}

impl RawDepthFrame {
    /// Build a depth frame from a native-endian `f32` byte buffer as handed
    /// over by a sensor driver.
    ///
    /// The byte buffer need not be aligned for `f32`.
    pub fn from_ne_bytes(
        bytes: &[u8],
        width: u32,
        height: u32,
        timestamp_us: u64,
        encoding: DepthEncoding,
    ) -> Result<Self> {
        match expected_len(width, height, std::mem::size_of::<f32>()) {
            Some(len) if len == bytes.len() => Ok(Self {
                data: bytemuck::pod_collect_to_vec(bytes),
                width,
                height,
                timestamp_us,
                encoding,
            }),
            _ => Err(CaptureError::FrameExtraction(format!(
                "depth buffer of {} bytes does not match {width}x{height} float32",
                bytes.len()
            ))),
        }
    }

    /// Check the frame holds exactly `width * height` samples.
    pub fn check_dimensions(&self) -> Result<()> {
        match expected_len(self.width, self.height, 1) {
            Some(len) if len == self.data.len() => Ok(()),
            _ => Err(CaptureError::FrameExtraction(format!(
                "depth frame of {} samples does not match {}x{}",
                self.data.len(),
                self.width,
                self.height
            ))),
        }
    }

    /// Number of samples in the frame.
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }

    /// Convert to disparity encoding. Disparity frames are returned as-is.
    ///
    /// Disparity is `1 / depth`: a zero depth becomes `+inf` and NaN stays NaN.
    pub fn into_disparity(mut self) -> Self {
        if self.encoding == DepthEncoding::Depth {
            for sample in &mut self.data {
                *sample = sample.recip();
            }
            self.encoding = DepthEncoding::Disparity;
        }
        self
    }
}

/// Capture pipeline configuration handed to a backend on `configure()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub color_width: u32,
    pub color_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    pub color_fps: f32,
    pub depth_fps: f32,
    /// Ask the sensor to fill invalid (NaN) samples before delivery.
    pub depth_filtering: bool,
    /// Cap the color stream at the depth stream's rate.
    pub match_depth_frame_rate: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            color_width: 640,
            color_height: 480,
            depth_width: 320,
            depth_height: 240,
            color_fps: 30.0,
            depth_fps: 24.0,
            depth_filtering: true,
            match_depth_frame_rate: true,
        }
    }
}

impl CaptureConfig {
    /// Reject configurations no device could satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.color_width == 0 || self.color_height == 0 {
            return Err(CaptureError::Configuration(format!(
                "invalid color resolution {}x{}",
                self.color_width, self.color_height
            )));
        }
        if self.depth_width == 0 || self.depth_height == 0 {
            return Err(CaptureError::Configuration(format!(
                "invalid depth resolution {}x{}",
                self.depth_width, self.depth_height
            )));
        }
        if self.color_fps <= 0.0 || !self.color_fps.is_finite() {
            return Err(CaptureError::Configuration(format!(
                "invalid color frame rate {}",
                self.color_fps
            )));
        }
        if self.depth_fps <= 0.0 || !self.depth_fps.is_finite() {
            return Err(CaptureError::Configuration(format!(
                "invalid depth frame rate {}",
                self.depth_fps
            )));
        }
        self.color_interval()?;
        self.depth_interval()?;
        Ok(())
    }

    /// Effective color frame rate after applying `match_depth_frame_rate`.
    pub fn effective_color_fps(&self) -> f32 {
        if self.match_depth_frame_rate {
            self.color_fps.min(self.depth_fps)
        } else {
            self.color_fps
        }
    }

    /// Time between color frames.
    pub fn color_interval(&self) -> Result<Duration> {
        frame_interval("color", self.effective_color_fps())
    }

    /// Time between depth frames.
    pub fn depth_interval(&self) -> Result<Duration> {
        frame_interval("depth", self.depth_fps)
    }
}

/// Frame period for `fps`. Rates so low the period overflows a `Duration`
/// are a configuration error.
fn frame_interval(stream: &str, fps: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(fps.recip()).map_err(|e| {
        CaptureError::Configuration(format!("{stream} frame rate {fps} is out of range: {e}"))
    })
}
