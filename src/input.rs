//! Keyboard and mouse state polled once per update
//!
//! [`InputState`] is fed from winit window and device events by the
//! application loop and read through the [`InputProvider`] trait by anything
//! that reacts to input (currently the fly camera). Per-frame data such as
//! the mouse delta is reset by [`InputState::begin_frame`].

use std::collections::HashSet;

use cgmath::Vector2;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Read-only view of the current input state.
pub trait InputProvider {
    /// Whether `key` is currently held.
    fn key_down(&self, key: KeyCode) -> bool;

    /// Whether `button` is currently held.
    fn mouse_down(&self, button: MouseButton) -> bool;

    /// Raw mouse movement since the last frame reset.
    fn mouse_delta(&self) -> Vector2<f32>;
}

#[derive(Debug)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    cursor_position: Option<Vector2<f32>>,
    mouse_delta: Vector2<f32>,
    keyboard_captured: bool,
    mouse_captured: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys_down: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            cursor_position: None,
            mouse_delta: Vector2::new(0.0, 0.0),
            keyboard_captured: false,
            mouse_captured: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call once per frame after the frame's input has been consumed.
    pub fn begin_frame(&mut self) {
        self.mouse_delta = Vector2::new(0.0, 0.0);
    }

    /// Process a window event and update input state.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.set_key(key, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.set_mouse_button(*button, *state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Some(Vector2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_position = None;
            }
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    /// Raw motion keeps producing deltas when the cursor is pinned at a
    /// screen edge, which cursor positions would not.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.add_mouse_motion(delta.0 as f32, delta.1 as f32);
        }
    }

    pub fn set_key(&mut self, key: KeyCode, down: bool) {
        if down {
            self.keys_down.insert(key);
        } else {
            self.keys_down.remove(&key);
        }
    }

    pub fn set_mouse_button(&mut self, button: MouseButton, down: bool) {
        if down {
            self.mouse_buttons_down.insert(button);
        } else {
            self.mouse_buttons_down.remove(&button);
        }
    }

    pub fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vector2::new(dx, dy);
    }

    /// Last cursor position inside the window, if the cursor is over it.
    pub fn cursor_position(&self) -> Option<Vector2<f32>> {
        self.cursor_position
    }

    /// While set, [`InputProvider::key_down`] reports every key as released.
    pub fn set_keyboard_capture(&mut self, captured: bool) {
        self.keyboard_captured = captured;
    }

    /// While set, mouse buttons read as released and the delta as zero.
    pub fn set_mouse_capture(&mut self, captured: bool) {
        self.mouse_captured = captured;
    }
}

impl InputProvider for InputState {
    fn key_down(&self, key: KeyCode) -> bool {
        !self.keyboard_captured && self.keys_down.contains(&key)
    }

    fn mouse_down(&self, button: MouseButton) -> bool {
        !self.mouse_captured && self.mouse_buttons_down.contains(&button)
    }

    fn mouse_delta(&self) -> Vector2<f32> {
        if self.mouse_captured {
            Vector2::new(0.0, 0.0)
        } else {
            self.mouse_delta
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_and_release() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, true);
        assert!(input.key_down(KeyCode::KeyW));
        assert!(!input.key_down(KeyCode::KeyS));

        input.set_key(KeyCode::KeyW, false);
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn test_mouse_motion_accumulates_until_frame_reset() {
        let mut input = InputState::new();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (10.0, -5.0) });
        input.add_mouse_motion(2.0, 0.0);
        assert_eq!(input.mouse_delta(), Vector2::new(12.0, -5.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_capture_hides_input() {
        let mut input = InputState::new();
        input.set_key(KeyCode::Space, true);
        input.set_mouse_button(MouseButton::Left, true);
        input.add_mouse_motion(4.0, 0.0);

        input.set_keyboard_capture(true);
        input.set_mouse_capture(true);
        assert!(!input.key_down(KeyCode::Space));
        assert!(!input.mouse_down(MouseButton::Left));
        assert_eq!(input.mouse_delta(), Vector2::new(0.0, 0.0));

        input.set_keyboard_capture(false);
        input.set_mouse_capture(false);
        assert!(input.key_down(KeyCode::Space));
        assert!(input.mouse_down(MouseButton::Left));
        assert_eq!(input.mouse_delta(), Vector2::new(4.0, 0.0));
    }
}
