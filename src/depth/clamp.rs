//! Display-range clamping for disparity maps.
//!
//! Disparity sensors report values in roughly `[0, +inf)`. Before a map can be
//! shown as an intensity image every sample is clipped into `[0.0, 1.0]`.
//! Values are clipped only, never rescaled.
//!
//! Invalid samples arrive as NaN. They are passed through unchanged here
//! (IEEE propagating clamp) and turned into black pixels at render time, see
//! [`crate::depth::render::sample_to_luma`]. A `min(1, max(v, 0))` built on
//! platform float min/max would instead turn NaN into 1.0 (full white), so
//! holes would be indistinguishable from the far clip.

/// Clamp a single sample into `[0.0, 1.0]`. NaN stays NaN.
#[inline]
pub fn clamp_sample(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Call `f` on every sample of a row-major `width * height` buffer exactly once.
///
/// The buffer must hold exactly `width * height` samples with no row padding.
pub fn for_each_sample<F>(buffer: &mut [f32], width: usize, height: usize, mut f: F)
where
    F: FnMut(&mut f32),
{
    debug_assert_eq!(buffer.len(), width * height, "buffer does not match {width}x{height}");
    if width == 0 {
        return;
    }
    for row in buffer.chunks_exact_mut(width).take(height) {
        row.iter_mut().for_each(&mut f);
    }
}

/// Clamp a disparity buffer into `[0.0, 1.0]` in place.
pub fn clamp_in_place(buffer: &mut [f32], width: usize, height: usize) {
    for_each_sample(buffer, width, height, |sample| *sample = clamp_sample(*sample));
}
