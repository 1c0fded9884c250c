//! Orbit camera producing the `P` and `V` matrices.

use glam::{Mat4, Vec3};

/// Camera orbiting the planet center at a fixed distance.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    /// Distance from `target`.
    pub distance: f32,
    /// Rotation about +Y in radians.
    pub yaw: f32,
    /// Elevation above the XZ plane in radians.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub const MIN_DISTANCE: f32 = 1.2;
    pub const MAX_DISTANCE: f32 = 20.0;

    pub fn new(distance: f32, fov_degrees: f32) -> Self {
        Self {
            distance: distance.clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE),
            fov_y: fov_degrees.to_radians(),
            ..Self::default()
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Perspective with reverse-Z: near maps to 1, far maps to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Move toward (negative) or away from (positive) the target.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-limit, limit);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 3.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 16.0 / 9.0,
            near: 0.05,
            far: 100.0,
        }
    }
}
