//! Recording runtime
//!
//! Session lifecycle, idle flushing, timeline sinks, configuration and errors.

pub mod channel;
pub mod config;
pub mod flusher;
pub mod session;
pub mod sink;

pub use channel::{RecordingChannel, RecordingError, RecordingResult};
pub use config::RecorderConfig;
pub use session::{EventOutcome, SessionHandle, TimelineSession};
pub use sink::{
    JsonLinesTimeline, JsonTimelineFile, MemoryTimeline, TimelineSink, TimelineWriter,
    UnfinishedTimeline,
};
