// Orbit camera around the particle cloud.
//
// Camera model:
//   - Always looks at the world origin
//   - Yaw/pitch change by dragging with the left mouse button
//   - Mouse wheel zooms between min_distance and max_distance
//   - No panning

use glam::{Mat4, Vec3};
use winit::event::MouseButton;

use super::input::InputState;

pub struct OrbitCamera {
    /// Distance from the origin.
    /// Private: always clamped to [min_distance, max_distance] in update(). Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Horizontal rotation in radians (0 = eye on +Z looking toward -Z)
    pub yaw: f32,
    /// Elevation in radians, kept short of the poles
    pub pitch: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians of rotation per pixel of mouse drag
    pub drag_speed: f32,
    /// Zoom change (in distance units) per scroll line
    pub zoom_speed: f32,
}

const PITCH_LIMIT: f32 = 1.5;

impl OrbitCamera {
    pub fn new(distance: f32, fov_degrees: f32, min_distance: f32, max_distance: f32) -> Self {
        Self {
            distance: distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            yaw: 0.0,
            pitch: 0.0,
            fov: fov_degrees.to_radians(),
            near: 0.1,
            far: 500.0,
            drag_speed: 0.005,
            zoom_speed: 2.0,
        }
    }

    /// Update from input. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState) {
        if input.is_button_held(MouseButton::Left) {
            let (dx, dy) = input.mouse_delta;
            self.yaw -= dx * self.drag_speed;
            self.pitch = (self.pitch + dy * self.drag_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        // Scroll up (positive delta) zooms in
        self.distance -= input.scroll_delta * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        ) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn distance(&self) -> f32 { self.distance }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_eye_on_z_axis() {
        let camera = OrbitCamera::new(25.0, 50.0, 10.0, 50.0);
        let eye = camera.camera_position();
        assert!((eye - Vec3::new(0.0, 0.0, 25.0)).length() < 1e-5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = OrbitCamera::new(25.0, 50.0, 10.0, 50.0);
        let mut input = InputState::new();
        input.scroll_delta = 100.0;
        camera.update(&input);
        assert_eq!(camera.distance(), 10.0);
        input.scroll_delta = -100.0;
        camera.update(&input);
        assert_eq!(camera.distance(), 50.0);
    }
}
