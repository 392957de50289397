use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::camera::types::RawDepthFrame;
use crate::depth::clamp::clamp_in_place;

/// A disparity map with every sample clamped into `[0.0, 1.0]` (or NaN).
///
/// Only constructible from a [`RawDepthFrame`], so the range invariant holds
/// for every instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampedDepthImage {
    data: Vec<f32>,
    width: u32,
    height: u32,
    timestamp_us: u64,
}

impl ClampedDepthImage {
    /// Convert the frame to disparity if needed, then clamp it in place.
    pub fn from_frame(frame: RawDepthFrame) -> Self {
        let mut frame = frame.into_disparity();
        clamp_in_place(&mut frame.data, frame.width as usize, frame.height as usize);
        Self {
            data: frame.data,
            width: frame.width,
            height: frame.height,
            timestamp_us: frame.timestamp_us,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Render as an opaque grayscale RGBA image at native resolution.
    pub fn to_rgba(&self) -> RgbaImage {
        let width = self.width as usize;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let luma = sample_to_luma(self.data[y as usize * width + x as usize]);
            Rgba([luma, luma, luma, u8::MAX])
        })
    }

    /// Render at `width x height`, resampling with nearest neighbour when the
    /// depth resolution differs from the requested one.
    pub fn to_rgba_sized(&self, width: u32, height: u32) -> RgbaImage {
        let native = self.to_rgba();
        if (self.width, self.height) == (width, height) {
            return native;
        }
        tracing::trace!(
            "resampling depth {}x{} to {width}x{height}",
            self.width,
            self.height
        );
        imageops::resize(&native, width, height, FilterType::Nearest)
    }
}

/// Map a clamped sample to an 8-bit intensity. Invalid (NaN) samples are black.
pub fn sample_to_luma(sample: f32) -> u8 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(0.0, 1.0) * 255.0).round() as u8
}
