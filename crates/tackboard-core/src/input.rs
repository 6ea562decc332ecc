//! Input state management for mouse/keyboard events.
//!
//! The outer window loop translates raw platform events into [`PointerEvent`]
//! and [`KeyEvent`] values and feeds them in here; the board consumes one
//! [`InputState`] snapshot per frame.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
}

/// Keyboard event type.
///
/// `Pressed` is delivered again by the platform on key auto-repeat;
/// `InputState` keeps the repeat-driven and debounced views apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
    /// A printable character typed this frame (routed to text editing).
    Char(char),
}

/// Tracks the current input state across frames.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Previous pointer position for delta calculations.
    pub previous_pointer_position: Point,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Buttons that were just pressed this frame.
    just_pressed_buttons: HashSet<MouseButton>,
    /// Buttons that were just released this frame.
    just_released_buttons: HashSet<MouseButton>,
    /// Accumulated scroll delta since last frame.
    pub scroll_delta: Vec2,
    /// Currently held keys.
    held_keys: HashSet<String>,
    /// Keys pressed this frame, including platform auto-repeats.
    pressed_keys: HashSet<String>,
    /// Keys pressed this frame for the first time since their release.
    single_pressed_keys: HashSet<String>,
    /// Printable characters typed this frame, in arrival order.
    typed: String,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.just_pressed_buttons.clear();
        self.just_released_buttons.clear();
        self.pressed_keys.clear();
        self.single_pressed_keys.clear();
        self.typed.clear();
        self.scroll_delta = Vec2::ZERO;
        self.previous_pointer_position = self.pointer_position;
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => {
                self.pointer_position = position;
                if self.pressed_buttons.insert(button) {
                    self.just_pressed_buttons.insert(button);
                }
            }
            PointerEvent::Up { position, button } => {
                self.pointer_position = position;
                if self.pressed_buttons.remove(&button) {
                    self.just_released_buttons.insert(button);
                }
            }
            PointerEvent::Move { position } => {
                self.pointer_position = position;
            }
            PointerEvent::Scroll { position, delta } => {
                self.pointer_position = position;
                self.scroll_delta += delta;
            }
        }
    }

    /// Process a key event.
    pub fn handle_key_event(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(key.clone());
                if self.held_keys.insert(key.clone()) {
                    // First press since release, not an auto-repeat
                    self.single_pressed_keys.insert(key);
                }
            }
            KeyEvent::Released(key) => {
                self.held_keys.remove(&key);
            }
            KeyEvent::Char(c) => {
                self.typed.push(c);
            }
        }
    }

    /// Check if a button is currently held.
    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Check if a button was just pressed this frame.
    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_buttons.contains(&button)
    }

    /// Check if a button was just released this frame.
    pub fn is_button_just_released(&self, button: MouseButton) -> bool {
        self.just_released_buttons.contains(&button)
    }

    /// Shorthand for a left click edge this frame.
    pub fn left_clicked(&self) -> bool {
        self.is_button_just_pressed(MouseButton::Left)
    }

    /// Shorthand for a left release edge this frame.
    pub fn left_released(&self) -> bool {
        self.is_button_just_released(MouseButton::Left)
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: &str) -> bool {
        self.held_keys.contains(key)
    }

    /// Check if a key was pressed this frame (fires again on auto-repeat).
    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Check if a key was pressed this frame for the first time since its
    /// release (debounced to once per physical press).
    pub fn is_key_single_pressed(&self, key: &str) -> bool {
        self.single_pressed_keys.contains(key)
    }

    /// Characters typed this frame, in arrival order.
    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// Get the pointer movement delta since last frame.
    pub fn pointer_delta(&self) -> Vec2 {
        Vec2::new(
            self.pointer_position.x - self.previous_pointer_position.x,
            self.pointer_position.y - self.previous_pointer_position.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press() {
        let mut input = InputState::new();

        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });

        assert!(input.is_button_held(MouseButton::Left));
        assert!(input.left_clicked());
        assert!(!input.is_button_held(MouseButton::Right));
    }

    #[test]
    fn test_button_release() {
        let mut input = InputState::new();

        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        input.handle_pointer_event(PointerEvent::Up {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });

        assert!(!input.is_button_held(MouseButton::Left));
        assert!(input.left_released());
    }

    #[test]
    fn test_begin_frame_clears_click_edge() {
        let mut input = InputState::new();

        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });

        assert!(input.left_clicked());

        input.begin_frame();

        assert!(!input.left_clicked());
        assert!(input.is_button_held(MouseButton::Left)); // Still held
    }

    #[test]
    fn test_pointer_delta() {
        let mut input = InputState::new();

        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(100.0, 100.0),
        });
        input.begin_frame();
        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(150.0, 120.0),
        });

        let delta = input.pointer_delta();
        assert!((delta.x - 50.0).abs() < f64::EPSILON);
        assert!((delta.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_key_single_press_debounce() {
        let mut input = InputState::new();

        input.handle_key_event(KeyEvent::Pressed("v".to_string()));
        assert!(input.is_key_pressed("v"));
        assert!(input.is_key_single_pressed("v"));

        // Auto-repeat from the platform while the key stays held
        input.begin_frame();
        input.handle_key_event(KeyEvent::Pressed("v".to_string()));
        assert!(input.is_key_pressed("v"));
        assert!(!input.is_key_single_pressed("v"));
        assert!(input.is_key_held("v"));

        // Release and press again: single-press fires again
        input.begin_frame();
        input.handle_key_event(KeyEvent::Released("v".to_string()));
        input.begin_frame();
        input.handle_key_event(KeyEvent::Pressed("v".to_string()));
        assert!(input.is_key_single_pressed("v"));
    }

    #[test]
    fn test_typed_characters() {
        let mut input = InputState::new();

        input.handle_key_event(KeyEvent::Char('h'));
        input.handle_key_event(KeyEvent::Char('i'));
        assert_eq!(input.typed(), "hi");

        input.begin_frame();
        assert_eq!(input.typed(), "");
    }

    #[test]
    fn test_scroll() {
        let mut input = InputState::new();

        input.handle_pointer_event(PointerEvent::Scroll {
            position: Point::new(100.0, 100.0),
            delta: Vec2::new(0.0, 10.0),
        });

        assert!((input.scroll_delta.y - 10.0).abs() < f64::EPSILON);

        input.begin_frame();
        assert!((input.scroll_delta.y).abs() < f64::EPSILON);
    }
}
