//! Action Timeline - frame-aligned user action logs for screen recordings.
//!
//! Raw key and mouse events are classified into clicks, key combos, typing
//! phrases and modifier-hold spans, stamped on the video's presentation
//! timeline and rounded to frame boundaries.

pub mod capture;
pub mod processing;
pub mod recorder;

pub use capture::{FrameClock, InstantFrameClock, ManualFrameClock};
pub use processing::{Action, ActionKind, ActionTracker, FrameRate};
pub use recorder::{RecorderConfig, RecordingError, RecordingResult, TimelineSession};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. Honors `RUST_LOG`; safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "action_timeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!("Starting Action Timeline v{}", env!("CARGO_PKG_VERSION"));
}
