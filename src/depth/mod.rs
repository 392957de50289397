// Depth domain: disparity clamping and depth image rendering.

pub mod clamp;
pub mod render;
