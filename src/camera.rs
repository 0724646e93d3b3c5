// camera.rs — 相机姿态 (位置 / 朝向 / FOV) 与默认姿态

use glam::{Mat3, Mat4, Quat, Vec3};

pub const DEFAULT_FOV: f32 = 75.0;
pub const MIN_FOV: f32 = 30.0;
pub const MAX_FOV: f32 = 120.0;

/// Slightly below and in front of the origin, like a standing viewer
/// looking up into the dome.
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, -0.07, 0.07);
pub const DEFAULT_TARGET: Vec3 = Vec3::ZERO;
pub const WORLD_UP: Vec3 = Vec3::Y;

const Z_NEAR: f32 = 0.01;
const Z_FAR: f32 = 2000.0;

pub fn clamp_fov(fov: f32) -> f32 {
    fov.clamp(MIN_FOV, MAX_FOV)
}

/// Orientation of a camera at `eye` looking at `target` (camera looks down -Z).
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Quat {
    let forward = (target - eye).normalize();
    let right = forward.cross(up).normalize();
    let true_up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, true_up, -forward)).normalize()
}

/// The one camera state every input path writes into.
///
/// `fov` is private so every write goes through the clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Quat,
    fov: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            orientation: look_at(DEFAULT_POSITION, DEFAULT_TARGET, WORLD_UP),
            fov: DEFAULT_FOV,
        }
    }
}

impl CameraPose {
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Non-finite values are dropped and the previous fov is kept.
    pub fn set_fov(&mut self, fov: f32) {
        if fov.is_finite() {
            self.fov = clamp_fov(fov);
        }
    }

    pub fn reset_to_default(&mut self) {
        *self = Self::default();
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, Z_NEAR, Z_FAR)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}
