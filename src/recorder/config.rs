//! Recorder configuration
//!
//! Every field has a default so partial JSON documents are accepted.

use crate::recorder::channel::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_TYPING_GAP_SECS: f64 = 5.0;
pub const DEFAULT_IDLE_PROBE_SECS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Frame rate of the video the timeline is aligned to
    pub fps: f64,
    /// Inactivity (seconds) that closes a typing phrase or modifier-hold span
    pub typing_gap_secs: f64,
    /// Cadence of the idle flusher
    pub idle_probe_secs: f64,
    /// Engage the debug capture collaborators (screenshots). No effect on classification.
    pub debug_capture: bool,
    /// Program and leading arguments used for debug screenshots; the output path is appended
    pub screenshot_command: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            typing_gap_secs: DEFAULT_TYPING_GAP_SECS,
            idle_probe_secs: DEFAULT_IDLE_PROBE_SECS,
            debug_capture: false,
            screenshot_command: vec!["screencapture".to_string(), "-x".to_string()],
        }
    }
}

impl RecorderConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> RecordingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded recorder config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> RecordingResult<()> {
        check_positive("fps", self.fps)?;
        check_positive("typingGapSecs", self.typing_gap_secs)?;
        check_positive("idleProbeSecs", self.idle_probe_secs)?;
        if self.debug_capture && self.screenshot_command.is_empty() {
            return Err(RecordingError::ConfigurationError(
                "screenshotCommand must name a program when debugCapture is on".to_string(),
            ));
        }
        Ok(())
    }

    /// Never zero; tokio intervals reject a zero period
    pub fn idle_probe_interval(&self) -> Duration {
        Duration::from_secs_f64(self.idle_probe_secs).max(Duration::from_millis(1))
    }
}

fn check_positive(name: &str, value: f64) -> RecordingResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RecordingError::ConfigurationError(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.typing_gap_secs, 5.0);
        assert_eq!(config.idle_probe_secs, 0.5);
        assert!(!config.debug_capture);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RecorderConfig = serde_json::from_str(r#"{"fps": 60}"#).unwrap();
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.typing_gap_secs, DEFAULT_TYPING_GAP_SECS);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let config = RecorderConfig {
            fps: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecordingError::ConfigurationError(_))
        ));

        let config = RecorderConfig {
            typing_gap_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_capture_needs_command() {
        let config = RecorderConfig {
            debug_capture: true,
            screenshot_command: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"typingGapSecs": 2.5, "debugCapture": true}}"#).unwrap();

        let config = RecorderConfig::load(file.path()).unwrap();
        assert_eq!(config.typing_gap_secs, 2.5);
        assert!(config.debug_capture);
        assert_eq!(config.fps, DEFAULT_FPS);
    }
}
