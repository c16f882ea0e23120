//! Timeline session
//!
//! Wires one action tracker to its collaborators for the lifetime of a recording:
//! input events and the idle flusher both go through a single tracker lock,
//! completed actions are queued to a writer task that owns the sink, and
//! shutdown force-closes whatever is still open. Debug screenshots run after
//! the tracker lock is released.

use crate::capture::clock::FrameClock;
use crate::capture::input::types::{InputEvent, InputEventKind};
use crate::capture::screenshot::{run_captures, DebugCapture};
use crate::processing::action::Action;
use crate::processing::tracker::ActionTracker;
use crate::recorder::channel::{RecordingError, RecordingResult};
use crate::recorder::config::RecorderConfig;
use crate::recorder::flusher::IdleFlusher;
use crate::recorder::sink::{TimelineSink, TimelineWriter, UnfinishedTimeline};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the event path should do after delivering an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    /// The event was the terminal signal, or the session is no longer accepting input
    Stop,
}

struct SessionShared {
    tracker: Arc<ParkingMutex<ActionTracker>>,
    clock: Arc<dyn FrameClock>,
    accepting: AtomicBool,
    actions: UnboundedSender<Action>,
    stop_requested: watch::Sender<bool>,
    debug_capture: Option<Arc<dyn DebugCapture>>,
}

impl SessionShared {
    fn handle_event(&self, event: &InputEvent) -> EventOutcome {
        let marks = {
            let mut tracker = self.tracker.lock();
            if !self.accepting.load(Ordering::SeqCst) {
                return EventOutcome::Stop;
            }

            if event.is_stop_signal() {
                self.accepting.store(false, Ordering::SeqCst);
                self.stop_requested.send_replace(true);
                tracing::info!("Stop signal received at {:.3}s", event.timestamp);
                return EventOutcome::Stop;
            }

            for action in tracker.handle(event) {
                if self.actions.send(action).is_err() {
                    tracing::warn!("Action queue closed; dropping action");
                }
            }
            tracker.take_marks()
        };

        run_captures(self.debug_capture.as_deref(), marks);
        EventOutcome::Continue
    }

    fn record(&self, kind: InputEventKind) -> EventOutcome {
        self.handle_event(&InputEvent::stamped(kind, self.clock.as_ref()))
    }
}

/// Cloneable event-path handle, usable from input hook threads
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub fn handle_event(&self, event: &InputEvent) -> EventOutcome {
        self.shared.handle_event(event)
    }

    pub fn record(&self, kind: InputEventKind) -> EventOutcome {
        self.shared.record(kind)
    }
}

pub struct TimelineSession {
    shared: Arc<SessionShared>,
    flusher_shutdown: watch::Sender<bool>,
    writer_shutdown: watch::Sender<bool>,
    flusher: JoinHandle<()>,
    writer: JoinHandle<Result<Box<dyn TimelineSink>, UnfinishedTimeline>>,
}

impl TimelineSession {
    /// Start a session writing to `sink`. Must be called inside a tokio runtime.
    pub fn start(
        config: &RecorderConfig,
        clock: Arc<dyn FrameClock>,
        sink: Box<dyn TimelineSink>,
    ) -> RecordingResult<Self> {
        Self::start_with(config, clock, TimelineWriter::new(sink), None)
    }

    /// Start a session around an existing writer. With `debug_capture` set, every
    /// span start and end is handed to it from the thread that caused it.
    pub fn start_with(
        config: &RecorderConfig,
        clock: Arc<dyn FrameClock>,
        writer: TimelineWriter,
        debug_capture: Option<Arc<dyn DebugCapture>>,
    ) -> RecordingResult<Self> {
        config.validate()?;

        let mut tracker = ActionTracker::from_config(config);
        if debug_capture.is_some() {
            tracker = tracker.with_capture_marks();
        }
        let tracker = Arc::new(ParkingMutex::new(tracker));
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (stop_requested, _) = watch::channel(false);
        let (flusher_shutdown, flusher_shutdown_rx) = watch::channel(false);
        let (writer_shutdown, writer_shutdown_rx) = watch::channel(false);

        let writer = tokio::spawn(writer.run(actions_rx, writer_shutdown_rx));
        let flusher = IdleFlusher::new(
            tracker.clone(),
            clock.clone(),
            actions_tx.clone(),
            config.idle_probe_interval(),
        )
        .with_debug_capture(debug_capture.clone())
        .spawn(flusher_shutdown_rx);

        tracing::info!(
            "Timeline session started (fps={}, typing_gap={}s, idle_probe={}s, debug_capture={})",
            config.fps,
            config.typing_gap_secs,
            config.idle_probe_secs,
            config.debug_capture
        );

        Ok(Self {
            shared: Arc::new(SessionShared {
                tracker,
                clock,
                accepting: AtomicBool::new(true),
                actions: actions_tx,
                stop_requested,
                debug_capture,
            }),
            flusher_shutdown,
            writer_shutdown,
            flusher,
            writer,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    /// Deliver one input event. Returns `Stop` once the terminal signal has been seen.
    pub fn handle_event(&self, event: &InputEvent) -> EventOutcome {
        self.shared.handle_event(event)
    }

    /// Stamp an event with the current presentation timestamp and deliver it
    pub fn record(&self, kind: InputEventKind) -> EventOutcome {
        self.shared.record(kind)
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn has_open_spans(&self) -> bool {
        self.shared.tracker.lock().has_open_spans()
    }

    /// Resolves once the terminal input event has been observed
    pub async fn wait_for_stop(&self) {
        let mut rx = self.shared.stop_requested.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Stop the session: force-close open spans at the current presentation
    /// timestamp, write everything to the sink, and hand the sink back.
    ///
    /// If the sink cannot finish, the error is `TimelineUnfinished`, which
    /// holds every unwritten action for a later retry.
    pub async fn stop(self) -> RecordingResult<Box<dyn TimelineSink>> {
        let _ = self.flusher_shutdown.send(true);
        if let Err(e) = self.flusher.await {
            tracing::warn!("Idle flusher task failed: {}", e);
        }

        let marks = {
            let mut tracker = self.shared.tracker.lock();
            self.shared.accepting.store(false, Ordering::SeqCst);
            let now = self.shared.clock.current_presentation_timestamp();
            let remaining = tracker.finish(now);
            tracing::debug!("Force-closed {} open action(s) at {:.3}s", remaining.len(), now);
            for action in remaining {
                if self.shared.actions.send(action).is_err() {
                    tracing::warn!("Action queue closed; dropping action");
                }
            }
            tracker.take_marks()
        };
        run_captures(self.shared.debug_capture.as_deref(), marks);

        let _ = self.writer_shutdown.send(true);
        let sink = self
            .writer
            .await
            .map_err(|e| RecordingError::SinkError(format!("Timeline writer task failed: {}", e)))??;

        tracing::info!("Timeline session stopped");
        Ok(sink)
    }
}
