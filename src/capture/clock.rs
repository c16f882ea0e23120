//! Frame clock adapters
//!
//! The video pipeline owns the presentation timeline. These adapters expose its
//! current presentation timestamp (seconds, 0 at the first frame) to the tracker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of the video pipeline's current presentation timestamp
pub trait FrameClock: Send + Sync {
    /// Seconds since the first captured frame; monotonically non-decreasing
    fn current_presentation_timestamp(&self) -> f64;
}

/// Clock anchored to a monotonic `Instant`, for pipelines that start with the recorder
#[derive(Debug, Clone)]
pub struct InstantFrameClock {
    origin: Instant,
}

impl InstantFrameClock {
    pub fn new() -> Self {
        Self::from_origin(Instant::now())
    }

    pub fn from_origin(origin: Instant) -> Self {
        Self { origin }
    }
}

impl Default for InstantFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for InstantFrameClock {
    fn current_presentation_timestamp(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock driven by whoever observes the encoder's presentation timestamps
#[derive(Debug, Default)]
pub struct ManualFrameClock {
    bits: AtomicU64,
}

impl ManualFrameClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Publish a new presentation timestamp. Earlier values are ignored.
    pub fn set(&self, t: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (t > f64::from_bits(current)).then(|| t.to_bits())
            });
    }

    pub fn advance(&self, dt: f64) {
        self.set(self.current_presentation_timestamp() + dt);
    }
}

impl FrameClock for ManualFrameClock {
    fn current_presentation_timestamp(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
