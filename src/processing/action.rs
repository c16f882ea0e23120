use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a completed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LeftClick,
    RightClick,
    KeyCombo,
    Typing,
    ModifierHold,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::LeftClick => write!(f, "left_click"),
            ActionKind::RightClick => write!(f, "right_click"),
            ActionKind::KeyCombo => write!(f, "key_combo"),
            ActionKind::Typing => write!(f, "typing"),
            ActionKind::ModifierHold => write!(f, "modifier_hold"),
        }
    }
}

/// A completed user action on the recording timeline.
///
/// `start` and `end` are seconds since the first video frame, quantized to
/// frame boundaries, with `start <= end`. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub description: String,
    pub start: f64,
    pub end: f64,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<15} {:8.2}s - {:8.2}s | {:?}",
            self.kind.to_string(),
            self.start,
            self.end,
            self.description
        )
    }
}
