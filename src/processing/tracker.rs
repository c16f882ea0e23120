//! Action tracker
//!
//! Coalesces low-level key and mouse events into discrete, classified actions:
//! clicks, key combos, typing phrases and modifier-hold spans. Timestamps are
//! kept raw while a span is open and quantized to frame boundaries only when
//! the action is emitted, so long spans do not accumulate rounding error.

use crate::capture::input::types::{
    InputEvent, InputEventKind, Key, Modifier, ModifierSet, MouseButton, Point,
};
use crate::capture::screenshot::{CaptureMark, CapturePhase};
use crate::processing::action::{Action, ActionKind};
use crate::processing::frames::FrameRate;
use crate::recorder::config::RecorderConfig;
use std::collections::BTreeMap;

pub const MODIFIER_HOLD_DESCRIPTION: &str = "mods held";

#[derive(Debug, Clone)]
struct ClickContext {
    point: Point,
    modifiers: ModifierSet,
    pressed_at: f64,
    index: usize,
}

#[derive(Debug, Clone)]
struct TypingPhrase {
    text: String,
    start: f64,
    last_key: f64,
    index: usize,
}

#[derive(Debug, Clone)]
struct ModifierHold {
    start: f64,
    last_key: f64,
    index: usize,
}

/// Stateful classifier turning input events into completed actions.
///
/// Every operation returns the actions completed by that call, in completion
/// order. The tracker never fails: out-of-order or unmatched events are no-ops.
///
/// Each span gets a 1-based index when it opens. With capture marks enabled the
/// tracker also queues a start mark on every open and an end mark on every
/// close, for the caller to drain with [`ActionTracker::take_marks`].
#[derive(Debug)]
pub struct ActionTracker {
    frames: FrameRate,
    gap_secs: f64,
    modifiers: ModifierSet,
    clicks: BTreeMap<MouseButton, ClickContext>,
    phrase: Option<TypingPhrase>,
    hold: Option<ModifierHold>,
    last_seen: f64,
    next_index: usize,
    capture_marks: bool,
    marks: Vec<CaptureMark>,
}

impl ActionTracker {
    pub fn new(frames: FrameRate, gap_secs: f64) -> Self {
        Self {
            frames,
            gap_secs,
            modifiers: ModifierSet::default(),
            clicks: BTreeMap::new(),
            phrase: None,
            hold: None,
            last_seen: 0.0,
            next_index: 0,
            capture_marks: false,
            marks: Vec::new(),
        }
    }

    /// Queue start/end capture marks as spans open and close
    pub fn with_capture_marks(mut self) -> Self {
        self.capture_marks = true;
        self
    }

    /// Capture marks queued since the last call, oldest first
    pub fn take_marks(&mut self) -> Vec<CaptureMark> {
        std::mem::take(&mut self.marks)
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(FrameRate::new(config.fps), config.typing_gap_secs)
    }

    pub fn frames(&self) -> FrameRate {
        self.frames
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }

    /// Text of the typing phrase still being accumulated, if any
    pub fn pending_phrase(&self) -> Option<&str> {
        self.phrase.as_ref().map(|p| p.text.as_str())
    }

    pub fn has_open_hold(&self) -> bool {
        self.hold.is_some()
    }

    pub fn has_open_spans(&self) -> bool {
        self.phrase.is_some() || self.hold.is_some() || !self.clicks.is_empty()
    }

    /// Latest timestamp observed on any event
    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    /// Dispatch a normalized event to the matching handler
    pub fn handle(&mut self, event: &InputEvent) -> Vec<Action> {
        let t = event.timestamp;
        match &event.kind {
            InputEventKind::KeyDown { key } => self.on_key_down(key, t),
            InputEventKind::KeyUp { key } => self.on_key_up(key, t),
            InputEventKind::MouseDown { button, point } => self.on_mouse_down(*button, *point, t),
            InputEventKind::MouseUp { button, point } => self.on_mouse_up(*button, *point, t),
        }
    }

    pub fn on_key_down(&mut self, key: &Key, t: f64) -> Vec<Action> {
        self.observe(t);
        let mut completed = Vec::new();

        match key {
            Key::Modifier(modifier, side) => {
                self.modifiers.press(*modifier, *side);
                return completed;
            }
            // Escape ends the session; it is never an action
            Key::Escape => return completed,
            _ => {}
        }

        if self.modifiers.has_chord() {
            self.close_phrase(t, &mut completed);
            let index = self.open_span(t);
            let description = format!("{}{}", self.modifiers.prefix(), key.symbol());
            completed.push(self.emit(ActionKind::KeyCombo, description, t, t));
            self.mark(index, CapturePhase::End, t);
            self.extend_hold(t);
            return completed;
        }

        let shift = self.modifiers.contains(Modifier::Shift);
        if let Some(token) = key.typing_token(shift) {
            self.append_typing(&token, t);
        } else if shift {
            self.close_phrase(t, &mut completed);
            self.extend_hold(t);
        }
        // Unmodified navigation and media keys are not recorded

        completed
    }

    pub fn on_key_up(&mut self, key: &Key, t: f64) -> Vec<Action> {
        self.observe(t);
        let mut completed = Vec::new();

        if let Key::Modifier(modifier, side) = key {
            self.modifiers.release(*modifier, *side);
            if self.modifiers.is_empty() {
                if let Some(hold) = self.hold.take() {
                    completed.push(self.emit(
                        ActionKind::ModifierHold,
                        MODIFIER_HOLD_DESCRIPTION.to_string(),
                        hold.start,
                        t,
                    ));
                    self.mark(hold.index, CapturePhase::End, t);
                }
            }
        }

        completed
    }

    pub fn on_mouse_down(&mut self, button: MouseButton, point: Point, t: f64) -> Vec<Action> {
        self.observe(t);
        let mut completed = Vec::new();
        if click_kind(button).is_none() {
            return completed;
        }

        self.close_phrase(t, &mut completed);
        let context = ClickContext {
            point,
            modifiers: self.modifiers,
            pressed_at: t,
            index: self.open_span(t),
        };
        if let Some(previous) = self.clicks.insert(button, context) {
            tracing::debug!(
                "Replacing unreleased {:?} press from {:.3}s with press at {:.3}s",
                button,
                previous.pressed_at,
                t
            );
        }

        completed
    }

    pub fn on_mouse_up(&mut self, button: MouseButton, point: Point, t: f64) -> Vec<Action> {
        self.observe(t);
        let mut completed = Vec::new();
        let Some(kind) = click_kind(button) else {
            return completed;
        };

        match self.clicks.remove(&button) {
            Some(context) => {
                tracing::trace!(
                    "{:?} click ({:.0},{:.0}) -> ({:.0},{:.0})",
                    button,
                    context.point.x,
                    context.point.y,
                    point.x,
                    point.y
                );
                let description = click_description(kind, &context.modifiers);
                completed.push(self.emit(kind, description, context.pressed_at, t));
                self.mark(context.index, CapturePhase::End, t);
            }
            None => tracing::debug!("Ignoring {:?} release without a matching press", button),
        }

        completed
    }

    /// Close spans that have been idle for at least the configured gap
    pub fn flush_idle(&mut self, now: f64) -> Vec<Action> {
        let mut completed = Vec::new();

        if self
            .phrase
            .as_ref()
            .is_some_and(|p| now - p.last_key >= self.gap_secs)
        {
            self.close_phrase(now, &mut completed);
        }

        if let Some(hold) = self.hold.as_ref() {
            if now - hold.last_key >= self.gap_secs {
                let (start, end, index) = (hold.start, hold.last_key, hold.index);
                self.hold = None;
                completed.push(self.emit(
                    ActionKind::ModifierHold,
                    MODIFIER_HOLD_DESCRIPTION.to_string(),
                    start,
                    end,
                ));
                self.mark(index, CapturePhase::End, now);
            }
        }

        completed
    }

    /// Force-close every open span at shutdown
    pub fn finish(&mut self, now: f64) -> Vec<Action> {
        let now = now.max(self.last_seen);
        let mut completed = Vec::new();

        self.close_phrase(now, &mut completed);

        if let Some(hold) = self.hold.take() {
            completed.push(self.emit(
                ActionKind::ModifierHold,
                MODIFIER_HOLD_DESCRIPTION.to_string(),
                hold.start,
                now.max(hold.last_key),
            ));
            self.mark(hold.index, CapturePhase::End, now);
        }

        let clicks = std::mem::take(&mut self.clicks);
        for (button, context) in clicks {
            if let Some(kind) = click_kind(button) {
                let description = click_description(kind, &context.modifiers);
                completed.push(self.emit(kind, description, context.pressed_at, now));
                self.mark(context.index, CapturePhase::End, now);
            }
        }

        self.modifiers = ModifierSet::default();
        completed
    }

    fn observe(&mut self, t: f64) {
        if t > self.last_seen {
            self.last_seen = t;
        }
    }

    /// Allocate the next span index and mark its start
    fn open_span(&mut self, t: f64) -> usize {
        self.next_index += 1;
        let index = self.next_index;
        self.mark(index, CapturePhase::Start, t);
        index
    }

    fn mark(&mut self, index: usize, phase: CapturePhase, timestamp: f64) {
        if self.capture_marks {
            self.marks.push(CaptureMark {
                index,
                phase,
                timestamp,
            });
        }
    }

    fn append_typing(&mut self, token: &str, t: f64) {
        if self.phrase.is_none() {
            let index = self.open_span(t);
            self.phrase = Some(TypingPhrase {
                text: String::new(),
                start: t,
                last_key: t,
                index,
            });
        }
        if let Some(phrase) = self.phrase.as_mut() {
            phrase.text.push_str(token);
            phrase.last_key = t;
        }
    }

    /// Emit the open phrase; `at` is when the close happens, not the phrase end
    fn close_phrase(&mut self, at: f64, completed: &mut Vec<Action>) {
        if let Some(phrase) = self.phrase.take() {
            completed.push(self.emit(
                ActionKind::Typing,
                phrase.text,
                phrase.start,
                phrase.last_key,
            ));
            self.mark(phrase.index, CapturePhase::End, at);
        }
    }

    fn extend_hold(&mut self, t: f64) {
        if let Some(hold) = self.hold.as_mut() {
            hold.last_key = t;
            return;
        }
        let index = self.open_span(t);
        self.hold = Some(ModifierHold {
            start: t,
            last_key: t,
            index,
        });
    }

    fn emit(&self, kind: ActionKind, description: String, start: f64, end: f64) -> Action {
        let start = self.frames.quantize(start);
        let end = self.frames.quantize(end).max(start);
        tracing::debug!("{} {:?} [{:.3}s, {:.3}s]", kind, description, start, end);
        Action {
            kind,
            description,
            start,
            end,
        }
    }
}

fn click_kind(button: MouseButton) -> Option<ActionKind> {
    match button {
        MouseButton::Left => Some(ActionKind::LeftClick),
        MouseButton::Right => Some(ActionKind::RightClick),
        _ => None,
    }
}

fn click_description(kind: ActionKind, modifiers: &ModifierSet) -> String {
    let name = match kind {
        ActionKind::RightClick => "right click",
        _ => "click",
    };
    format!("{}{}", modifiers.prefix(), name)
}
