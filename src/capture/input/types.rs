use crate::capture::clock::FrameClock;
use serde::{Deserialize, Serialize};

/// Modifier keys, declared in canonical description order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    Ctrl,
    Option,
    Command,
    Shift,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [
        Modifier::Ctrl,
        Modifier::Option,
        Modifier::Command,
        Modifier::Shift,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Option => "option",
            Modifier::Command => "command",
            Modifier::Shift => "shift",
        }
    }

    /// Modifiers that turn a key press into a key combo. Shift alone only changes case.
    pub fn is_chord(self) -> bool {
        !matches!(self, Modifier::Shift)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    Right,
}

/// Normalized key identity as delivered by the input source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Modifier(Modifier, Side),
    /// A character-producing key, as produced by the layout
    Char(char),
    Space,
    Tab,
    Enter,
    Backspace,
    Delete,
    Escape,
    /// Navigation, function and media keys, by lower-case name (e.g. "up", "f5", "volume_up")
    Named(String),
}

impl Key {
    /// Token appended to a typing phrase, or `None` if the key does not type.
    pub fn typing_token(&self, shift: bool) -> Option<String> {
        match self {
            Key::Char(c) if !c.is_control() => {
                let c = if shift { c.to_ascii_uppercase() } else { *c };
                Some(c.to_string())
            }
            Key::Space => Some(" ".to_string()),
            Key::Tab => Some("\t".to_string()),
            Key::Enter => Some("\n".to_string()),
            Key::Backspace => Some("<BACKSPACE>".to_string()),
            Key::Delete => Some("<DELETE>".to_string()),
            _ => None,
        }
    }

    /// Symbol used in combo descriptions (`ctrl+option+K`)
    pub fn symbol(&self) -> String {
        match self {
            Key::Modifier(modifier, _) => modifier.name().to_string(),
            Key::Char(c) => c.to_uppercase().to_string(),
            Key::Space => "space".to_string(),
            Key::Tab => "tab".to_string(),
            Key::Enter => "enter".to_string(),
            Key::Backspace => "backspace".to_string(),
            Key::Delete => "delete".to_string(),
            Key::Escape => "escape".to_string(),
            Key::Named(name) => name.clone(),
        }
    }
}

/// Set of held modifier keys, tracked per physical side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSet {
    bits: u8,
}

impl ModifierSet {
    fn bit(modifier: Modifier, side: Side) -> u8 {
        let index = modifier as u8 * 2 + side as u8;
        1 << index
    }

    fn mask(modifier: Modifier) -> u8 {
        Self::bit(modifier, Side::Left) | Self::bit(modifier, Side::Right)
    }

    pub fn press(&mut self, modifier: Modifier, side: Side) {
        self.bits |= Self::bit(modifier, side);
    }

    /// Release a modifier key. Releasing a key that is not held is a no-op.
    pub fn release(&mut self, modifier: Modifier, side: Side) {
        self.bits &= !Self::bit(modifier, side);
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.bits & Self::mask(modifier) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// True if ctrl, option or command is held
    pub fn has_chord(&self) -> bool {
        Modifier::ALL
            .iter()
            .any(|m| m.is_chord() && self.contains(*m))
    }

    /// Held modifiers in canonical order, sides collapsed
    pub fn held(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(|m| self.contains(*m))
    }

    /// `ctrl+option+` style prefix, empty when nothing is held
    pub fn prefix(&self) -> String {
        self.held().map(|m| format!("{}+", m.name())).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "eventType")]
pub enum InputEventKind {
    KeyDown { key: Key },
    KeyUp { key: Key },
    MouseDown { button: MouseButton, point: Point },
    MouseUp { button: MouseButton, point: Point },
}

/// A low-level input notification stamped on the presentation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    #[serde(flatten)]
    pub kind: InputEventKind,
    /// Seconds in the frame clock's timebase
    pub timestamp: f64,
}

impl InputEvent {
    pub fn new(kind: InputEventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }

    /// Stamp an event with the clock's current presentation timestamp
    pub fn stamped(kind: InputEventKind, clock: &dyn FrameClock) -> Self {
        Self::new(kind, clock.current_presentation_timestamp())
    }

    pub fn key_down(key: Key, timestamp: f64) -> Self {
        Self::new(InputEventKind::KeyDown { key }, timestamp)
    }

    pub fn key_up(key: Key, timestamp: f64) -> Self {
        Self::new(InputEventKind::KeyUp { key }, timestamp)
    }

    pub fn mouse_down(button: MouseButton, point: Point, timestamp: f64) -> Self {
        Self::new(InputEventKind::MouseDown { button, point }, timestamp)
    }

    pub fn mouse_up(button: MouseButton, point: Point, timestamp: f64) -> Self {
        Self::new(InputEventKind::MouseUp { button, point }, timestamp)
    }

    /// The key press that ends a recording session
    pub fn is_stop_signal(&self) -> bool {
        matches!(&self.kind, InputEventKind::KeyDown { key: Key::Escape })
    }
}
