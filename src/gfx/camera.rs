//! Camera maths and orbit controls
//!
//! The projection is built in OpenGL convention (depth in `[-1, 1]`) and then
//! corrected into wgpu clip space (depth in `[0, 1]`) with
//! [`OPENGL_TO_WGPU_MATRIX`].

use cgmath::{perspective, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::RenderConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Perspective projection mapping view space into wgpu clip space
pub fn perspective_matrix(fovy: f32, aspect: f32, z_near: f32, z_far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * perspective(Rad(fovy), aspect, z_near, z_far)
}

/// Right-handed view matrix looking from `eye` toward `center`
pub fn look_at_matrix(eye: Vector3<f32>, center: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(Point3::from_vec(eye), Point3::from_vec(center), up)
}

/// Distance and pitch limits for [`OrbitCamera`]
#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 50.0,
        }
    }
}

/// Camera orbiting a target point on a sphere
///
/// With zero pitch and yaw the eye sits on the +Z axis, so the default camera
/// looks from `(0, 0, distance)` toward the origin with +Y up.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    default_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, fovy: f32, znear: f32, zfar: f32, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch: 0.0,
            yaw: 0.0,
            eye: Vector3::zero(), // Computed in `update()`
            target: Vector3::zero(),
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy,
            znear,
            zfar,
            default_distance: distance,
        };
        camera.update();
        camera
    }

    /// Camera at the configured distance with the window's aspect ratio
    pub fn from_config(render: &RenderConfig) -> Self {
        Self::new(
            render.camera_distance,
            render.fov_y,
            render.z_near,
            render.z_far,
            render.width as f32 / render.height.max(1) as f32,
        )
    }

    pub fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let view = look_at_matrix(self.eye, self.target, self.up);
        let proj = perspective_matrix(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }

    pub fn reset_to_default(&mut self) {
        self.distance = self.default_distance;
        self.pitch = 0.0;
        self.yaw = 0.0;
        self.target = Vector3::zero();
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.bounds.min_distance, self.bounds.max_distance);
        self.update();
    }

    /// Zooms proportionally to the current distance.
    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance * (1.0 + delta));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.yaw = (self.yaw + delta) % std::f32::consts::TAU;
        self.update();
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Direction from the eye toward the target
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.eye).normalize()
    }

    fn update(&mut self) {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.eye = self.target
            + Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance;
    }
}

/// Mouse and keyboard driven orbit controls
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            is_mouse_pressed: false,
        }
    }

    /// Returns true when the camera moved
    pub fn process_events(&mut self, event: &DeviceEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
                false
            }
            DeviceEvent::MouseWheel { delta } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / 100.0
                    }
                };
                camera.add_distance(scroll_amount * self.zoom_speed);
                true
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                camera.add_yaw(-delta.0 as f32 * self.rotate_speed);
                camera.add_pitch(delta.1 as f32 * self.rotate_speed);
                true
            }
            _ => false,
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyR),
                state: ElementState::Pressed,
                ..
            } => {
                log::info!("Resetting camera to default position");
                camera.reset_to_default();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    fn default_camera() -> OrbitCamera {
        OrbitCamera::new(5.0, std::f32::consts::FRAC_PI_3, 0.1, 100.0, 1.5)
    }

    fn project(camera: &OrbitCamera, point: Vector3<f32>) -> Vector3<f32> {
        let clip = camera.build_view_projection_matrix() * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn test_default_eye() {
        let camera = default_camera();
        assert_relative_eq!(camera.eye, Vector3::new(0.0, 0.0, 5.0), epsilon = 1e-6);
        assert_relative_eq!(camera.forward(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let ndc = project(&default_camera(), Vector3::zero());
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_near_and_far_planes_map_to_depth_range() {
        let camera = default_camera();
        let near = project(&camera, Vector3::new(0.0, 0.0, 5.0 - 0.1));
        let far = project(&camera, Vector3::new(0.0, 0.0, 5.0 - 100.0));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-4);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_perspective_is_w_divided() {
        let proj = perspective_matrix(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let clip = proj * Vector4::new(0.0, 0.0, -5.0, 1.0);
        assert_relative_eq!(clip.w, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_opengl_depth_remapped_to_unit_range() {
        let near = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.3, -0.2, -2.0, 2.0);
        assert_relative_eq!(near, Vector4::new(0.3, -0.2, 0.0, 2.0), epsilon = 1e-6);

        let far = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.0, 0.0, 3.0, 3.0);
        assert_relative_eq!(far, Vector4::new(0.0, 0.0, 3.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_and_distance_are_clamped() {
        let mut camera = default_camera();
        camera.set_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);

        camera.set_distance(1000.0);
        assert_eq!(camera.distance, camera.bounds.max_distance);
        camera.set_distance(0.0);
        assert_eq!(camera.distance, camera.bounds.min_distance);
    }

    #[test]
    fn test_reset_restores_default_eye() {
        let mut camera = default_camera();
        camera.add_yaw(1.0);
        camera.add_pitch(0.5);
        camera.set_distance(12.0);
        camera.reset_to_default();
        assert_relative_eq!(camera.eye, Vector3::new(0.0, 0.0, 5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_from_config_matches_explicit_camera() {
        let camera = OrbitCamera::from_config(&RenderConfig::default());
        assert_eq!(camera.aspect, 1.5);
        assert_eq!(
            camera.build_view_projection_matrix(),
            default_camera().build_view_projection_matrix()
        );
    }

    #[test]
    fn test_zero_sized_resize_keeps_aspect() {
        let mut camera = default_camera();
        camera.resize_projection(0, 600);
        assert_eq!(camera.aspect, 1.5);
        camera.resize_projection(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
