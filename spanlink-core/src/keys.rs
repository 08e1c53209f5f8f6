//! Keyboard dispatch.
//!
//! [`route`] maps a key plus the current [`Mode`] to a [`Command`]. It is pure
//! so every front end (terminal or browser) shares the same bindings.

use crate::interaction::Mode;

/// Front-end independent key identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    /// Command/Super key
    pub meta: bool,
    /// Focus is inside an editable field (import path, search box, ...)
    pub in_editable: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            in_editable: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    fn modified(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pick the label at this vocabulary index
    ChooseLabel(usize),
    /// Pick the relation type at this vocabulary index
    ChooseRelationType(usize),
    /// Give the selected span the label at this vocabulary index
    RelabelSelected(usize),
    NextDocument,
    PrevDocument,
    DeleteSelected,
    ClearPending,
    Undo,
    /// Swallowed without effect
    Ignore,
}

fn digit_index(key: Key) -> Option<usize> {
    match key {
        Key::Char(c @ '1'..='9') => c.to_digit(10).map(|d| d as usize - 1),
        _ => None,
    }
}

/// Route a key press. `None` leaves the key to the front end.
pub fn route(input: &KeyInput, mode: &Mode) -> Option<Command> {
    if input.in_editable {
        return None;
    }

    if let Some(index) = digit_index(input.key) {
        return Some(if input.modified() {
            match mode {
                Mode::PendingRelationTypeChoice { .. } => Command::ChooseRelationType(index),
                _ => Command::Ignore,
            }
        } else {
            match mode {
                Mode::PendingLabelChoice(_) => Command::ChooseLabel(index),
                Mode::Idle => Command::RelabelSelected(index),
                _ => return None,
            }
        });
    }

    match input.key {
        Key::Char('z' | 'Z') if input.modified() => Some(Command::Undo),
        Key::Space if !input.modified() => Some(match mode {
            Mode::PendingLabelChoice(_) => Command::ChooseLabel(0),
            _ => Command::NextDocument,
        }),
        Key::Right if !input.modified() => Some(Command::NextDocument),
        Key::Left if !input.modified() => Some(Command::PrevDocument),
        Key::Delete | Key::Backspace => Some(Command::DeleteSelected),
        Key::Escape => Some(Command::ClearPending),
        _ => None,
    }
}
