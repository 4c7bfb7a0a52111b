use cgmath::{Vector2, Vector3, Zero};
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::input::InputProvider;

/// Key bindings for the fly camera.
///
/// Forward/back and strafe move along the camera's own axes; up/down move
/// along world Y regardless of where the camera looks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraController {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    pub look_button: MouseButton,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            up: KeyCode::Space,
            down: KeyCode::KeyX,
            look_button: MouseButton::Left,
        }
    }
}

/// Movement requested by the input for one frame, before speed scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntent {
    /// Unit steps along the camera's right / up / forward axes.
    pub relative: Vector3<f32>,
    /// Unit steps along world Y.
    pub vertical: f32,
    /// Mouse delta while the look button is held.
    pub look: Option<Vector2<f32>>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self, input: &dyn InputProvider) -> CameraIntent {
        let axis = |positive: KeyCode, negative: KeyCode| {
            let mut value = 0.0;
            if input.key_down(positive) {
                value += 1.0;
            }
            if input.key_down(negative) {
                value -= 1.0;
            }
            value
        };

        let relative = Vector3::new(
            axis(self.right, self.left),
            0.0,
            axis(self.forward, self.back),
        );
        let vertical = axis(self.up, self.down);

        let look = if input.mouse_down(self.look_button) {
            Some(input.mouse_delta()).filter(|delta| !delta.is_zero())
        } else {
            None
        };

        CameraIntent {
            relative,
            vertical,
            look,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;

    #[test]
    fn test_default_bindings() {
        let controller = CameraController::new();
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyA, true);
        input.set_key(KeyCode::KeyX, true);

        let intent = controller.sample(&input);
        assert_eq!(intent.relative, Vector3::new(-1.0, 0.0, 1.0));
        assert_eq!(intent.vertical, -1.0);
        assert_eq!(intent.look, None);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let controller = CameraController::new();
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, true);
        input.set_key(KeyCode::KeyS, true);

        assert_eq!(controller.sample(&input).relative, Vector3::zero());
    }

    #[test]
    fn test_look_requires_button() {
        let controller = CameraController::new();
        let mut input = InputState::new();
        input.add_mouse_motion(3.0, -2.0);
        assert_eq!(controller.sample(&input).look, None);

        input.set_mouse_button(MouseButton::Left, true);
        assert_eq!(controller.sample(&input).look, Some(Vector2::new(3.0, -2.0)));
    }
}
