//! Capture-side collaborators
//!
//! The frame clock, normalized input events, and debug screenshots.

pub mod clock;
pub mod input;
pub mod screenshot;

pub use clock::{FrameClock, InstantFrameClock, ManualFrameClock};
pub use input::ActionTrackingChannel;
pub use screenshot::{CaptureMark, CapturePhase, DebugCapture, ScreenshotCommand};
