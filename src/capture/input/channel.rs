use crate::capture::clock::FrameClock;
use crate::capture::input::types::{InputEvent, InputEventKind};
use crate::capture::screenshot::{DebugCapture, ScreenshotCommand};
use crate::recorder::channel::{RecordingChannel, RecordingError, RecordingResult};
use crate::recorder::config::RecorderConfig;
use crate::recorder::session::{EventOutcome, SessionHandle, TimelineSession};
use crate::recorder::sink::{JsonTimelineFile, TimelineWriter, UnfinishedTimeline};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Routes input events to whichever session is currently recording.
/// Events delivered while paused or stopped are dropped.
#[derive(Clone, Default)]
pub struct ChannelEvents {
    current: Arc<ParkingMutex<Option<SessionHandle>>>,
}

impl ChannelEvents {
    pub fn handle_event(&self, event: &InputEvent) -> EventOutcome {
        match self.current.lock().as_ref() {
            Some(handle) => handle.handle_event(event),
            None => EventOutcome::Continue,
        }
    }

    pub fn record(&self, kind: InputEventKind) -> EventOutcome {
        match self.current.lock().as_ref() {
            Some(handle) => handle.record(kind),
            None => EventOutcome::Continue,
        }
    }
}

pub struct ActionTrackingChannel {
    id: String,
    config: RecorderConfig,
    clock: Arc<dyn FrameClock>,
    is_recording: Arc<AtomicBool>,
    output_dir: Option<PathBuf>,
    session_index: usize,
    output_files: Arc<ParkingMutex<Vec<String>>>,

    events: ChannelEvents,
    session: Option<TimelineSession>,
    /// Timeline whose last stop failed to write, with its destination
    unfinished: Option<(PathBuf, Box<UnfinishedTimeline>)>,
}

impl ActionTrackingChannel {
    pub fn new(config: RecorderConfig, clock: Arc<dyn FrameClock>) -> Self {
        Self {
            id: "actions".to_string(),
            config,
            clock,
            is_recording: Arc::new(AtomicBool::new(false)),
            output_dir: None,
            session_index: 0,
            output_files: Arc::new(ParkingMutex::new(Vec::new())),
            events: ChannelEvents::default(),
            session: None,
            unfinished: None,
        }
    }

    fn session_basename(&self) -> String {
        format!("recording-{}", self.session_index)
    }

    fn output_dir(&self) -> RecordingResult<PathBuf> {
        self.output_dir.clone().ok_or_else(|| {
            RecordingError::ConfigurationError("Output directory not set".to_string())
        })
    }

    /// Path of the timeline file for the current session
    pub fn timeline_path(&self) -> RecordingResult<PathBuf> {
        Ok(self
            .output_dir()?
            .join(format!("{}-actions.json", self.session_basename())))
    }

    pub fn screenshots_dir(&self) -> RecordingResult<PathBuf> {
        Ok(self
            .output_dir()?
            .join(format!("{}-screenshots", self.session_basename())))
    }

    /// Event-path handle for input hooks; stays valid across pause/resume
    pub fn events(&self) -> ChannelEvents {
        self.events.clone()
    }

    pub fn handle_event(&self, event: &InputEvent) -> EventOutcome {
        self.events.handle_event(event)
    }

    /// Resolves once the current session has seen its terminal input event
    pub async fn wait_for_stop(&self) {
        if let Some(session) = self.session.as_ref() {
            session.wait_for_stop().await;
        }
    }

    /// Whether a timeline from an earlier stop is still waiting to be written
    pub fn has_unfinished_timeline(&self) -> bool {
        self.unfinished.is_some()
    }

    fn build_debug_capture(&self) -> RecordingResult<Option<Arc<dyn DebugCapture>>> {
        if !self.config.debug_capture {
            return Ok(None);
        }

        let screenshots = self.screenshots_dir()?;
        let capture: Arc<dyn DebugCapture> = Arc::new(ScreenshotCommand::new(
            &self.config.screenshot_command,
            &screenshots,
        )?);
        tracing::info!("Debug capture enabled (screenshots in {})", screenshots.display());
        Ok(Some(capture))
    }

    fn register_timeline(&self, timeline_path: &Path) {
        self.output_files
            .lock()
            .push(timeline_path.to_string_lossy().to_string());
        tracing::info!("Action tracking stopped ({})", timeline_path.display());
    }

    /// Keep a timeline that failed to finish so the next `stop` can retry it
    fn settle(&mut self, timeline_path: PathBuf, result: RecordingResult<()>) -> RecordingResult<()> {
        match result {
            Ok(()) => {
                self.register_timeline(&timeline_path);
                Ok(())
            }
            Err(RecordingError::TimelineUnfinished(unfinished)) => {
                let message = format!("{} ({})", unfinished, timeline_path.display());
                self.unfinished = Some((timeline_path, unfinished));
                Err(RecordingError::SinkError(message))
            }
            Err(e) => Err(e),
        }
    }

    fn retry_unfinished(&mut self) -> RecordingResult<()> {
        let Some((timeline_path, unfinished)) = self.unfinished.take() else {
            return Ok(());
        };
        let result = unfinished.retry().map(|_| ()).map_err(RecordingError::from);
        self.settle(timeline_path, result)
    }
}

#[async_trait]
impl RecordingChannel for ActionTrackingChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn initialize(&mut self, output_dir: &Path, session_index: usize) -> RecordingResult<()> {
        self.config.validate()?;
        self.output_dir = Some(output_dir.to_path_buf());
        self.session_index = session_index;
        self.output_files.lock().clear();

        tracing::info!(
            "Action tracking channel initialized (fps={}, session={})",
            self.config.fps,
            self.session_index
        );
        Ok(())
    }

    async fn start(&mut self) -> RecordingResult<()> {
        if self.is_recording.load(Ordering::SeqCst) {
            return Err(RecordingError::AlreadyRecording);
        }
        self.retry_unfinished()?;

        let output_dir = self.output_dir()?;
        std::fs::create_dir_all(&output_dir)?;

        let writer = TimelineWriter::new(Box::new(JsonTimelineFile::new(self.timeline_path()?)));
        let session = TimelineSession::start_with(
            &self.config,
            self.clock.clone(),
            writer,
            self.build_debug_capture()?,
        )?;
        *self.events.current.lock() = Some(session.handle());
        self.session = Some(session);
        self.is_recording.store(true, Ordering::SeqCst);

        tracing::info!("Action tracking started");
        Ok(())
    }

    /// Stop the session and write its timeline. If writing fails the timeline
    /// is kept, and the next `stop` (or `start`) retries it first.
    async fn stop(&mut self) -> RecordingResult<()> {
        if !self.is_recording.load(Ordering::SeqCst) {
            return self.retry_unfinished();
        }

        self.is_recording.store(false, Ordering::SeqCst);
        self.events.current.lock().take();

        let session = self.session.take().ok_or(RecordingError::NotRecording)?;
        let timeline_path = self.timeline_path()?;
        let result = session.stop().await.map(|_| ());
        self.settle(timeline_path, result)
    }

    async fn pause(&mut self) -> RecordingResult<()> {
        self.stop().await
    }

    async fn resume(&mut self, session_index: usize) -> RecordingResult<()> {
        self.session_index = session_index;
        self.start().await
    }

    fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    fn output_files(&self) -> Vec<String> {
        self.output_files.lock().clone()
    }
}
