//! Frame quantization
//!
//! Maps timestamps on the presentation timeline onto video frame boundaries
//! so actions can be correlated with specific frames without float drift.

/// Frame rate of the recording the timeline is aligned to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    fps: f64,
}

impl FrameRate {
    /// Create a frame rate. Callers validate `fps` (see `RecorderConfig::validate`).
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Duration of one frame in seconds
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.fps
    }

    /// Index of the frame boundary nearest to `t`. Negative times map to frame 0.
    pub fn frame_index(&self, t: f64) -> u64 {
        (t * self.fps).round().max(0.0) as u64
    }

    /// Round `t` (seconds) to the nearest frame boundary: `round(t * fps) / fps`
    pub fn quantize(&self, t: f64) -> f64 {
        self.frame_index(t) as f64 / self.fps
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(crate::recorder::config::DEFAULT_FPS)
    }
}
