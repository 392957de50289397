use serde::Serialize;
use std::time::Instant;

/// Collects diagnostic statistics for a depth preview session.
pub struct DiagnosticStats {
    color_frames: u64,
    depth_frames: u64,
    drop_count: u64,
    extraction_errors: u64,
    start_time: Instant,
    last_frame_time: Option<Instant>,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub color_fps: f64,
    pub depth_fps: f64,
    pub color_frames: u64,
    pub depth_frames: u64,
    pub drop_count: u64,
    pub extraction_errors: u64,
    pub drop_rate: f64,
    pub presented: u64,
    pub superseded: u64,
    pub idle_ms: Option<f64>,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            color_frames: 0,
            depth_frames: 0,
            drop_count: 0,
            extraction_errors: 0,
            start_time: Instant::now(),
            last_frame_time: None,
        }
    }

    /// Record a color frame that was handed to the display.
    pub fn record_color_frame(&mut self) {
        self.color_frames += 1;
        self.last_frame_time = Some(Instant::now());
    }

    /// Record a depth frame that replaced the current overlay.
    pub fn record_depth_frame(&mut self) {
        self.depth_frames += 1;
        self.last_frame_time = Some(Instant::now());
    }

    /// Record a frame delivered while the session was not running.
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    /// Record a frame that arrived without usable data. Counts as a drop.
    pub fn record_extraction_error(&mut self) {
        self.extraction_errors += 1;
        self.drop_count += 1;
    }

    fn rate(&self, count: u64) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    /// Color frames per second since the last reset.
    pub fn color_fps(&self) -> f64 {
        self.rate(self.color_frames)
    }

    /// Depth frames per second since the last reset.
    pub fn depth_fps(&self) -> f64 {
        self.rate(self.depth_frames)
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.color_frames + self.depth_frames + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot. Display counters are owned by the
    /// display thread and passed in.
    pub fn snapshot(&self, presented: u64, superseded: u64) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            color_fps: self.color_fps(),
            depth_fps: self.depth_fps(),
            color_frames: self.color_frames,
            depth_frames: self.depth_frames,
            drop_count: self.drop_count,
            extraction_errors: self.extraction_errors,
            drop_rate: self.drop_rate(),
            presented,
            superseded,
            idle_ms: self
                .last_frame_time
                .map(|t| t.elapsed().as_secs_f64() * 1000.0),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}
