// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::vision::sim::HandPose;

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    buttons_held: HashSet<MouseButton>,

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            buttons_held: HashSet::new(),
            scroll_delta: 0.0,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the app's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.set_key(key, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => { self.buttons_held.insert(*button); }
                    ElementState::Released => { self.buttons_held.remove(button); }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Focused(false) => {
                // Releases are lost while unfocused; don't leave a pose stuck on.
                self.keys_held.clear();
                self.buttons_held.clear();
            }
            _ => {}
        }
    }

    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    /// Simulated hand pose from the held keys.
    /// Space (pinch) wins over F (fist), O (open palm) and U (thumb up).
    pub fn hand_pose(&self) -> HandPose {
        if self.is_key_held(KeyCode::Space) {
            HandPose::Pinch
        } else if self.is_key_held(KeyCode::KeyF) {
            HandPose::Fist
        } else if self.is_key_held(KeyCode::KeyO) {
            HandPose::OpenPalm
        } else if self.is_key_held(KeyCode::KeyU) {
            HandPose::ThumbUp
        } else {
            HandPose::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_pose_priority() {
        let mut input = InputState::new();
        assert_eq!(input.hand_pose(), HandPose::Absent);

        input.set_key(KeyCode::KeyO, true);
        assert_eq!(input.hand_pose(), HandPose::OpenPalm);
        input.set_key(KeyCode::KeyF, true);
        assert_eq!(input.hand_pose(), HandPose::Fist);
        input.set_key(KeyCode::Space, true);
        assert_eq!(input.hand_pose(), HandPose::Pinch);

        input.set_key(KeyCode::Space, false);
        input.set_key(KeyCode::KeyF, false);
        input.set_key(KeyCode::KeyO, false);
        assert_eq!(input.hand_pose(), HandPose::Absent);
    }

    #[test]
    fn test_end_frame_resets_scroll() {
        let mut input = InputState::new();
        input.scroll_delta = 2.0;
        input.mouse_position = (10.0, 4.0);
        input.end_frame();
        assert_eq!(input.scroll_delta, 0.0);
        assert_eq!(input.mouse_delta, (10.0, 4.0));
        input.end_frame();
        assert_eq!(input.mouse_delta, (0.0, 0.0));
    }
}
