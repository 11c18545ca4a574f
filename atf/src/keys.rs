//! Logical keys and mouse buttons, and the translation tables backends use to
//! turn them into native input.

use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Home,
    End,
    ArrowDown,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Control,
    Windows,
    Alt,
    F4,
    Shift,
    Tab,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseButton {
    Undefined,
    #[default]
    Left,
    Right,
}

/// One keyboard event of a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStroke {
    Down(Key),
    /// Down immediately followed by up.
    Press(Key),
    Up(Key),
}

/// Expands a combination into events: every key but the last is held down in
/// order, the last is pressed, then the held keys are released in reverse.
pub fn combo_strokes(keys: &[Key]) -> Vec<KeyStroke> {
    let Some((last, held)) = keys.split_last() else {
        return Vec::new();
    };
    let mut strokes = Vec::with_capacity(held.len() * 2 + 1);
    strokes.extend(held.iter().map(|k| KeyStroke::Down(*k)));
    strokes.push(KeyStroke::Press(*last));
    strokes.extend(held.iter().rev().map(|k| KeyStroke::Up(*k)));
    strokes
}

pub fn combo_label(keys: &[Key]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

/// Fixed logical-to-native key table of one backend.
#[derive(Debug, Clone)]
pub struct KeyMap<C: Copy + 'static> {
    entries: &'static [(Key, C)],
}

impl<C: Copy + 'static> KeyMap<C> {
    pub const fn new(entries: &'static [(Key, C)]) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, key: Key) -> Result<C, AutomationError> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, code)| *code)
            .ok_or_else(|| AutomationError::KeyNotMapped(key.to_string()))
    }
}
