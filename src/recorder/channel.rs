//! Recording channel trait
//!
//! Defines the interface a recording coordinator drives for every capture source.
//! The action timeline is exposed to coordinators through this trait.

use crate::recorder::sink::UnfinishedTimeline;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Timeline sink error: {0}")]
    SinkError(String),

    /// Carries the writer so the caller can retry the shutdown
    #[error("{0}")]
    TimelineUnfinished(Box<UnfinishedTimeline>),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Trait for recording channels
///
/// Each channel represents a capture source (display, audio, input).
/// Channels are managed by a recording coordinator.
#[async_trait]
pub trait RecordingChannel: Send + Sync {
    /// Get the channel identifier (e.g., "display", "actions")
    fn id(&self) -> &str;

    /// Initialize the channel with the output directory
    async fn initialize(&mut self, output_dir: &Path, session_index: usize) -> RecordingResult<()>;

    /// Start recording
    async fn start(&mut self) -> RecordingResult<()>;

    /// Stop recording
    async fn stop(&mut self) -> RecordingResult<()>;

    /// Pause recording
    async fn pause(&mut self) -> RecordingResult<()>;

    /// Resume recording (starts a new session)
    async fn resume(&mut self, session_index: usize) -> RecordingResult<()>;

    /// Check if the channel is currently recording
    fn is_recording(&self) -> bool;

    /// Get output files created by this channel
    fn output_files(&self) -> Vec<String>;
}
