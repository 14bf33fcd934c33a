//! Typed input events and the editor's keyboard shortcuts

use bitflags::bitflags;
use std::collections::{HashSet, VecDeque};

/// Keys the editor core interprets. Everything else arrives as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    E,
    R,
    F,
    G,
    D,
    Y,
    Z,
    F1,
    Delete,
    Escape,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const CTRL = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// One platform event, already translated out of the windowing layer.
/// Positions are in window pixels with the origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown { key: Key, modifiers: Modifiers },
    KeyUp { key: Key, modifiers: Modifiers },
    MouseDown { button: MouseButton, x: f32, y: f32, modifiers: Modifiers },
    MouseUp { button: MouseButton, x: f32, y: f32, modifiers: Modifiers },
    MouseMove { x: f32, y: f32, modifiers: Modifiers },
    Wheel { delta: f32 },
    Resize { width: u32, height: u32 },
}

/// What a keyboard shortcut asks the editor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    TranslateMode,
    RotateMode,
    ScaleMode,
    ResetCamera,
    ToggleGrid,
    ToggleHelp,
    DeleteSelection,
    DuplicateSelection,
    Undo,
    Redo,
    CancelDrag,
}

/// Map a key press to an editor action
pub fn shortcut(key: Key, modifiers: Modifiers) -> Option<EditorAction> {
    let ctrl = modifiers.contains(Modifiers::CTRL);
    let shift = modifiers.contains(Modifiers::SHIFT);
    let action = match (key, ctrl) {
        (Key::Z, true) if shift => EditorAction::Redo,
        (Key::Z, true) => EditorAction::Undo,
        (Key::Y, true) => EditorAction::Redo,
        (Key::D, true) => EditorAction::DuplicateSelection,
        (Key::W, false) => EditorAction::TranslateMode,
        (Key::E, false) => EditorAction::RotateMode,
        (Key::R, false) => EditorAction::ScaleMode,
        (Key::F, false) => EditorAction::ResetCamera,
        (Key::G, false) => EditorAction::ToggleGrid,
        (Key::F1, _) => EditorAction::ToggleHelp,
        (Key::Delete, _) => EditorAction::DeleteSelection,
        (Key::Escape, _) => EditorAction::CancelDrag,
        _ => return None,
    };
    Some(action)
}

/// Queued events plus the held-down state derived from them
#[derive(Debug, Default)]
pub struct InputState {
    queue: VecDeque<InputEvent>,
    keys_down: HashSet<Key>,
    buttons_down: HashSet<MouseButton>,
    modifiers: Modifiers,
    mouse_position: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next drain
    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take every queued event in submission order, updating held state as
    /// each one goes by
    pub fn drain(&mut self) -> Vec<InputEvent> {
        let events: Vec<InputEvent> = self.queue.drain(..).collect();
        for event in &events {
            self.track(event);
        }
        events
    }

    fn track(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown { key, modifiers } => {
                self.keys_down.insert(key);
                self.modifiers = modifiers;
            }
            InputEvent::KeyUp { key, modifiers } => {
                self.keys_down.remove(&key);
                self.modifiers = modifiers;
            }
            InputEvent::MouseDown { button, x, y, modifiers } => {
                self.buttons_down.insert(button);
                self.mouse_position = (x, y);
                self.modifiers = modifiers;
            }
            InputEvent::MouseUp { button, x, y, modifiers } => {
                self.buttons_down.remove(&button);
                self.mouse_position = (x, y);
                self.modifiers = modifiers;
            }
            InputEvent::MouseMove { x, y, modifiers } => {
                self.mouse_position = (x, y);
                self.modifiers = modifiers;
            }
            InputEvent::Wheel { .. } | InputEvent::Resize { .. } => {}
        }
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn mouse_position(&self) -> (f32, f32) {
        self.mouse_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_keys() {
        assert_eq!(shortcut(Key::W, Modifiers::empty()), Some(EditorAction::TranslateMode));
        assert_eq!(shortcut(Key::E, Modifiers::empty()), Some(EditorAction::RotateMode));
        assert_eq!(shortcut(Key::R, Modifiers::empty()), Some(EditorAction::ScaleMode));
        assert_eq!(shortcut(Key::F, Modifiers::empty()), Some(EditorAction::ResetCamera));
        assert_eq!(shortcut(Key::G, Modifiers::empty()), Some(EditorAction::ToggleGrid));
        assert_eq!(shortcut(Key::F1, Modifiers::empty()), Some(EditorAction::ToggleHelp));
        assert_eq!(shortcut(Key::Delete, Modifiers::empty()), Some(EditorAction::DeleteSelection));
    }

    #[test]
    fn ctrl_shortcuts() {
        let ctrl = Modifiers::CTRL;
        assert_eq!(shortcut(Key::Z, ctrl), Some(EditorAction::Undo));
        assert_eq!(shortcut(Key::Z, ctrl | Modifiers::SHIFT), Some(EditorAction::Redo));
        assert_eq!(shortcut(Key::Y, ctrl), Some(EditorAction::Redo));
        assert_eq!(shortcut(Key::D, ctrl), Some(EditorAction::DuplicateSelection));
        // Plain letters without ctrl do nothing
        assert_eq!(shortcut(Key::Z, Modifiers::empty()), None);
        assert_eq!(shortcut(Key::D, Modifiers::empty()), None);
        // Ctrl+W is not the translate shortcut
        assert_eq!(shortcut(Key::W, ctrl), None);
    }

    #[test]
    fn drain_tracks_held_state() {
        let mut input = InputState::new();
        input.push(InputEvent::KeyDown { key: Key::Z, modifiers: Modifiers::CTRL });
        input.push(InputEvent::MouseDown {
            button: MouseButton::Left,
            x: 10.0,
            y: 20.0,
            modifiers: Modifiers::ALT,
        });
        assert_eq!(input.pending(), 2);
        let events = input.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(input.pending(), 0);
        assert!(input.is_key_down(Key::Z));
        assert!(input.is_button_down(MouseButton::Left));
        assert_eq!(input.modifiers(), Modifiers::ALT);
        assert_eq!(input.mouse_position(), (10.0, 20.0));

        input.push(InputEvent::MouseUp {
            button: MouseButton::Left,
            x: 12.0,
            y: 20.0,
            modifiers: Modifiers::empty(),
        });
        input.drain();
        assert!(!input.is_button_down(MouseButton::Left));
    }
}
