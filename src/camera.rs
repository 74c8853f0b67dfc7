use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::event::{MouseScrollDelta, WindowEvent};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const MIN_PITCH: f32 = -0.2;
const MAX_PITCH: f32 = 1.45;
/// Pixels of touchpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

/// Third person camera orbiting a target.
///
/// Yaw 0 puts the camera on the +Z side of the target looking towards -Z.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
    follow_multiplier: f32,
    drag_sensitivity: f32,
    position: Point3<f32>,
    look_at: Point3<f32>,
}

impl FollowCamera {
    /// Starts at the configured position looking at the origin; the orbit
    /// angles are taken from that start position.
    pub fn new(config: &CameraConfig) -> Self {
        let [x, y, z] = config.start_position;
        let offset = Vector3::new(x, y, z);
        let horizontal = (x * x + z * z).sqrt();
        Self {
            yaw: x.atan2(z),
            pitch: y.atan2(horizontal).clamp(MIN_PITCH, MAX_PITCH),
            distance: config
                .init_distance
                .clamp(config.min_distance, config.max_distance),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            follow_multiplier: config.follow_multiplier,
            drag_sensitivity: config.drag_sensitivity,
            position: Point3::from_vec(offset),
            look_at: Point3::origin(),
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Horizontal unit vector the camera looks along.
    pub fn forward(&self) -> Vector3<f32> {
        Vector3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Horizontal unit vector to the camera's right.
    pub fn right(&self) -> Vector3<f32> {
        Vector3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    pub fn handle_drag(&mut self, dx: f64, dy: f64) {
        self.yaw -= dx as f32 * self.drag_sensitivity;
        self.pitch = (self.pitch + dy as f32 * self.drag_sensitivity).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance - steps).clamp(self.min_distance, self.max_distance);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::MouseWheel { delta, .. } = event {
            let steps = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
            };
            self.zoom(steps);
        }
    }

    fn orbit_offset(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vector3::new(
            cos_pitch * self.yaw.sin(),
            sin_pitch,
            cos_pitch * self.yaw.cos(),
        ) * self.distance
    }

    /// Eases towards the orbit position around `target`.
    pub fn update(&mut self, target: Point3<f32>, dt: f32) {
        let t = 1.0 - (-self.follow_multiplier * dt).exp();
        let desired = target + self.orbit_offset();
        self.position += (desired - self.position) * t;
        self.look_at += (target - self.look_at) * t;
    }

    /// Jumps straight to the orbit position around `target`.
    pub fn snap(&mut self, target: Point3<f32>) {
        self.position = target + self.orbit_offset();
        self.look_at = target;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let mut eye = self.position;
        if (self.look_at - eye).magnitude2() < f32::EPSILON {
            eye += Vector3::unit_z() * self.min_distance;
        }
        Matrix4::look_at_rh(eye, self.look_at, Vector3::unit_y())
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
