//! Polled input state.
//!
//! The window delivers key and pointer events as they arrive; they only
//! mutate this plain struct. The frame loop reads it once per frame.

use std::collections::HashSet;

use glam::Vec2;

/// Physical keys the viewer reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    Shift,
    Tab,
    P,
    L,
    H,
    C,
    Z,
    R,
    Digit1,
    Digit2,
    Digit3,
    Escape,
}

/// Discrete pointer events in window pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
}

#[derive(Clone, Debug, Default)]
pub struct InputState {
    keys_down: HashSet<Key>,
    /// Last pointer position while a button is held.
    anchor: Option<Vec2>,
    /// Drag accumulated since the last `take_drag`.
    drag: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the key was not already held (a fresh press).
    pub fn key_down(&mut self, key: Key) -> bool {
        self.keys_down.insert(key)
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys_down.remove(&key);
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { x, y } => {
                self.anchor = Some(Vec2::new(x, y));
            }
            PointerEvent::Move { x, y } => {
                if let Some(anchor) = self.anchor {
                    let position = Vec2::new(x, y);
                    self.drag += position - anchor;
                    self.anchor = Some(position);
                }
            }
            PointerEvent::Up { x, y } => {
                if let Some(anchor) = self.anchor.take() {
                    self.drag += Vec2::new(x, y) - anchor;
                }
            }
        }
    }

    /// Drag delta since the previous call, then reset to zero.
    pub fn take_drag(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag)
    }

    /// Drop held keys and any drag in progress (e.g. on focus loss).
    pub fn clear(&mut self) {
        self.keys_down.clear();
        self.anchor = None;
        self.drag = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let mut input = InputState::new();
        assert!(input.key_down(Key::W));
        assert!(!input.key_down(Key::W));
        assert!(input.is_down(Key::W));
        input.key_up(Key::W);
        assert!(!input.is_down(Key::W));
    }

    #[test]
    fn test_drag_accumulates_and_is_taken_once() {
        let mut input = InputState::new();
        input.pointer(PointerEvent::Down { x: 10.0, y: 10.0 });
        input.pointer(PointerEvent::Move { x: 15.0, y: 8.0 });
        input.pointer(PointerEvent::Move { x: 20.0, y: 12.0 });
        assert_eq!(input.take_drag(), Vec2::new(10.0, 2.0));
        assert_eq!(input.take_drag(), Vec2::ZERO);

        input.pointer(PointerEvent::Up { x: 21.0, y: 12.0 });
        assert_eq!(input.take_drag(), Vec2::new(1.0, 0.0));
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_move_without_button_is_ignored() {
        let mut input = InputState::new();
        input.pointer(PointerEvent::Move { x: 100.0, y: 100.0 });
        assert_eq!(input.take_drag(), Vec2::ZERO);
    }
}
