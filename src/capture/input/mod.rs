//! Input event capture
//!
//! Normalized key and mouse events, and a `RecordingChannel` that turns them
//! into a frame-aligned action timeline written next to the video.

pub mod channel;
pub mod types;

pub use channel::{ActionTrackingChannel, ChannelEvents};
pub use types::{InputEvent, InputEventKind, Key, Modifier, ModifierSet, MouseButton, Point, Side};
