//! Input event classification
//!
//! Turns raw evdev events into the small set of event shapes the relay
//! actually forwards: key transitions and relative pointer motion. Everything
//! else (sync markers, LED echoes, absolute axes) is filtered out here.

pub mod keymap;

use evdev::{InputEvent, InputEventKind, Key, RelativeAxisType};

pub use keymap::{consumer_usage, keyboard_usage, mouse_button_bit};

/// Key transition carried by an evdev key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Up,
    Down,
    Repeat,
}

impl KeyState {
    fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Up),
            1 => Some(KeyState::Down),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }
}

/// A key or button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub state: KeyState,
}

/// Relative pointer motion, one axis per evdev event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseMotion {
    pub dx: i32,
    pub dy: i32,
    pub wheel: i32,
}

/// An input event worth relaying to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayedEvent {
    Key(KeyPress),
    Motion(MouseMotion),
}

/// Classify a raw evdev event. Returns `None` for events the relay ignores.
pub fn classify(event: &InputEvent) -> Option<RelayedEvent> {
    match event.kind() {
        InputEventKind::Key(key) => {
            let state = KeyState::from_value(event.value())?;
            Some(RelayedEvent::Key(KeyPress { key, state }))
        }
        InputEventKind::RelAxis(axis) => {
            let mut motion = MouseMotion::default();
            match axis {
                RelativeAxisType::REL_X => motion.dx = event.value(),
                RelativeAxisType::REL_Y => motion.dy = event.value(),
                RelativeAxisType::REL_WHEEL => motion.wheel = event.value(),
                _ => return None,
            }
            Some(RelayedEvent::Motion(motion))
        }
        _ => None,
    }
}

/// Canonical name for a key, e.g. `KEY_LEFTCTRL` or `BTN_LEFT`.
pub fn key_name(key: Key) -> String {
    format!("{key:?}")
}
