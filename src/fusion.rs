// fusion.rs — 设备方向传感器 → 平滑相机朝向
//
// 传感器线程只写单槽信箱 (最新值覆盖旧值); 渲染帧里做 slerp 平滑。

use glam::{EulerRot, Quat};
use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex};

use crate::camera::CameraPose;

/// Fraction of the remaining angular gap closed per render tick.
/// Applied per tick, not per second, so convergence speed follows frame rate.
pub const SMOOTHING_FACTOR: f32 = 0.1;

/// Raw device reading in degrees. Any component may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    /// Compass heading, about the vertical axis.
    pub alpha: Option<f32>,
    /// Front-back tilt, about the lateral axis.
    pub beta: Option<f32>,
    /// Left-right tilt, about the depth axis.
    pub gamma: Option<f32>,
}

impl OrientationSample {
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    /// `None` if any angle is missing or non-finite.
    pub fn to_orientation(&self) -> Option<Quat> {
        let (a, b, g) = (self.alpha?, self.beta?, self.gamma?);
        if !(a.is_finite() && b.is_finite() && g.is_finite()) {
            return None;
        }
        Some(device_orientation(a, b, g))
    }
}

/// Device frame → scene frame. Heading about Y, front-back tilt about X,
/// negated side tilt about Z (intrinsic Y-X-Z), then -90° about X so that a
/// phone held upright looks at the horizon instead of the floor.
pub fn device_orientation(alpha_deg: f32, beta_deg: f32, gamma_deg: f32) -> Quat {
    let euler = Quat::from_euler(
        EulerRot::YXZ,
        alpha_deg.to_radians(),
        beta_deg.to_radians(),
        -gamma_deg.to_radians(),
    );
    (euler * Quat::from_rotation_x(-FRAC_PI_2)).normalize()
}

#[derive(Debug, Default)]
struct Slot {
    attached: bool,
    target: Option<Quat>,
}

/// Single-slot, last-value-wins mailbox between the sensor and the render
/// tick. Cheap to clone; every clone talks to the same slot.
#[derive(Debug, Clone, Default)]
pub struct SensorMailbox {
    inner: Arc<Mutex<Slot>>,
}

impl SensorMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert and store a sample. Returns false if the sample was dropped,
    /// either because it was incomplete or because nobody is listening.
    pub fn push(&self, sample: OrientationSample) -> bool {
        let Some(target) = sample.to_orientation() else {
            return false;
        };
        let Ok(mut slot) = self.inner.lock() else {
            return false;
        };
        if !slot.attached {
            return false;
        }
        slot.target = Some(target);
        true
    }

    pub fn latest(&self) -> Option<Quat> {
        self.inner.lock().ok().and_then(|slot| slot.target)
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().map(|slot| slot.attached).unwrap_or(false)
    }

    fn attach(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            slot.attached = true;
            slot.target = None;
        }
    }

    fn detach(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            slot.attached = false;
            slot.target = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingState {
    pub current: Quat,
    pub target: Quat,
}

impl SmoothingState {
    pub fn at(orientation: Quat) -> Self {
        Self {
            current: orientation,
            target: orientation,
        }
    }

    pub fn step(&mut self) -> Quat {
        self.current = self.current.slerp(self.target, SMOOTHING_FACTOR).normalize();
        self.current
    }
}

/// Motion-controlled orientation. Holding one of these is what "listening
/// to the sensor" means: it attaches the mailbox on creation and detaches
/// it on drop, so late samples after a mode switch go nowhere.
#[derive(Debug)]
pub struct OrientationFusion {
    mailbox: SensorMailbox,
    smoothing: SmoothingState,
}

impl OrientationFusion {
    pub fn attach(mailbox: SensorMailbox, start: Quat) -> Self {
        mailbox.attach();
        Self {
            mailbox,
            smoothing: SmoothingState::at(start),
        }
    }

    #[cfg(test)]
    pub fn smoothing(&self) -> &SmoothingState {
        &self.smoothing
    }

    /// Snap the smoothed orientation without touching the sensor target.
    pub fn jump_to(&mut self, orientation: Quat) {
        self.smoothing.current = orientation;
        if self.mailbox.latest().is_none() {
            self.smoothing.target = orientation;
        }
    }

    /// Once per render tick: pick up the latest target, advance, write.
    pub fn tick(&mut self, pose: &mut CameraPose) {
        if let Some(target) = self.mailbox.latest() {
            self.smoothing.target = target;
        }
        pose.orientation = self.smoothing.step();
    }
}

impl Drop for OrientationFusion {
    fn drop(&mut self) {
        self.mailbox.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const EPS: f32 = 1e-4;

    fn same_rotation(a: Quat, b: Quat) -> bool {
        a.dot(b).abs() > 1.0 - 1e-5
    }

    fn angle(a: Quat, b: Quat) -> f32 {
        2.0 * a.dot(b).abs().min(1.0).acos()
    }

    #[test]
    fn upright_device_looks_at_horizon() {
        // phone upright (beta = 90) facing north
        let q = device_orientation(0.0, 90.0, 0.0);
        let forward = q * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_Z).length() < EPS, "{forward:?}");
    }

    #[test]
    fn flat_device_looks_down() {
        let q = device_orientation(0.0, 0.0, 0.0);
        let forward = q * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_Y).length() < EPS, "{forward:?}");
    }

    #[test]
    fn heading_turns_about_vertical_axis() {
        let q = device_orientation(90.0, 90.0, 0.0);
        let forward = q * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_X).length() < EPS, "{forward:?}");
    }

    #[test]
    fn incomplete_samples_are_rejected() {
        let sample = OrientationSample {
            alpha: Some(10.0),
            beta: None,
            gamma: Some(0.0),
        };
        assert!(sample.to_orientation().is_none());
        assert!(OrientationSample::new(f32::NAN, 0.0, 0.0).to_orientation().is_none());
    }

    #[test]
    fn invalid_sample_keeps_previous_target() {
        let mailbox = SensorMailbox::new();
        let _fusion = OrientationFusion::attach(mailbox.clone(), Quat::IDENTITY);

        assert!(mailbox.push(OrientationSample::new(30.0, 60.0, 5.0)));
        let kept = mailbox.latest();
        assert!(!mailbox.push(OrientationSample::default()));
        assert_eq!(mailbox.latest(), kept);
    }

    #[test]
    fn last_sample_wins() {
        let mailbox = SensorMailbox::new();
        let _fusion = OrientationFusion::attach(mailbox.clone(), Quat::IDENTITY);
        mailbox.push(OrientationSample::new(10.0, 90.0, 0.0));
        mailbox.push(OrientationSample::new(20.0, 90.0, 0.0));
        let expected = device_orientation(20.0, 90.0, 0.0);
        assert!(same_rotation(mailbox.latest().unwrap(), expected));
    }

    #[test]
    fn detached_mailbox_drops_samples() {
        let mailbox = SensorMailbox::new();
        assert!(!mailbox.push(OrientationSample::new(0.0, 90.0, 0.0)));

        let fusion = OrientationFusion::attach(mailbox.clone(), Quat::IDENTITY);
        assert!(mailbox.is_attached());
        drop(fusion);
        assert!(!mailbox.is_attached());
        assert!(!mailbox.push(OrientationSample::new(0.0, 90.0, 0.0)));
        assert!(mailbox.latest().is_none());
    }

    #[test]
    fn smoothing_decays_geometrically() {
        let q0 = Quat::IDENTITY;
        let qt = Quat::from_rotation_y(1.2);
        let mut state = SmoothingState { current: q0, target: qt };
        let initial = angle(q0, qt);

        for n in 1..=30 {
            state.step();
            let expected = initial * 0.9f32.powi(n);
            let gap = angle(state.current, qt);
            assert!((gap - expected).abs() < 1e-3, "step {n}: {gap} vs {expected}");
        }
        assert!(angle(state.current, qt) > 0.0);
    }

    #[test]
    fn tick_writes_smoothed_orientation_into_pose() {
        let mailbox = SensorMailbox::new();
        let mut pose = CameraPose::default();
        let start = pose.orientation;
        let mut fusion = OrientationFusion::attach(mailbox.clone(), start);

        mailbox.push(OrientationSample::new(0.0, 90.0, 0.0));
        let target = mailbox.latest().unwrap();
        fusion.tick(&mut pose);

        let gap = angle(pose.orientation, target);
        let expected = angle(start, target) * 0.9;
        assert!((gap - expected).abs() < 1e-3);
        assert_eq!(fusion.smoothing().current, pose.orientation);
    }
}
