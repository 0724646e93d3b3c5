// orbit.rs — 拖拽环视 (固定位置, 只改朝向)

use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::camera::CameraPose;

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

fn yaw_pitch(forward: Vec3) -> (f32, f32) {
    let f = forward.normalize_or_zero();
    ((-f.x).atan2(-f.z), f.y.clamp(-1.0, 1.0).asin())
}

/// Look-around drag control. Keeps its own yaw/pitch offset relative to the
/// default view; that offset is the state a reset throws away.
///
/// Drag direction is inverted relative to a classic orbit camera: dragging
/// right pulls the sky right, so the view turns left.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    base_yaw: f32,
    base_pitch: f32,
    yaw_offset: f32,
    pitch_offset: f32,
    rotate_speed: f32,
}

impl OrbitControls {
    pub fn new(rotate_speed: f32) -> Self {
        let (base_yaw, base_pitch) = yaw_pitch(CameraPose::default().forward());
        Self {
            base_yaw,
            base_pitch,
            yaw_offset: 0.0,
            pitch_offset: 0.0,
            rotate_speed,
        }
    }

    /// Adopt whatever direction `pose` is currently facing and level it.
    /// Orbit has no roll, so any device roll is dropped here, at handover,
    /// rather than on the first drag.
    pub fn sync_to(&mut self, pose: &mut CameraPose) {
        let (yaw, pitch) = yaw_pitch(pose.forward());
        self.yaw_offset = yaw - self.base_yaw;
        self.pitch_offset = pitch - self.base_pitch;
        pose.orientation = self.orientation();
    }

    pub fn discard_offset(&mut self) {
        self.yaw_offset = 0.0;
        self.pitch_offset = 0.0;
    }

    pub fn orientation(&self) -> Quat {
        let pitch = (self.base_pitch + self.pitch_offset).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Quat::from_rotation_y(self.base_yaw + self.yaw_offset) * Quat::from_rotation_x(pitch)
    }

    /// Apply a pointer drag in pixels. Only the orientation is written.
    pub fn drag(&mut self, dx: f32, dy: f32, pose: &mut CameraPose) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        self.yaw_offset += dx * self.rotate_speed;
        // keep the stored offset inside the limit so drags back respond at once
        let pitch = (self.base_pitch + self.pitch_offset + dy * self.rotate_speed)
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.pitch_offset = pitch - self.base_pitch;

        pose.orientation = self.orientation();
    }
}
