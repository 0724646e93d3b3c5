// runtime.rs — 场景运行时: 合并外部输入 / 手势 / 传感器 → 唯一相机姿态
//
// 所有写入都发生在事件循环线程; 传感器线程只碰 SensorMailbox。

use glam::{Mat4, Vec2};

use crate::camera::{CameraPose, DEFAULT_FOV};
use crate::config::{ControlsConfig, GeometryConfig};
use crate::fusion::{OrientationFusion, SensorMailbox};
use crate::gesture::{GestureSource, ZoomController};
use crate::material::{bind_material, MaterialBinding};
use crate::mesh::{build_surface, surface_transform, SurfaceMesh};
use crate::orbit::OrbitControls;
use crate::projection::{ProjectionMode, SceneInputs};
use crate::reset::ResetController;

/// Who currently owns the camera orientation. Exactly one at a time.
#[derive(Debug)]
pub enum ControlMode {
    Orbit(OrbitControls),
    OrientationFusion(OrientationFusion),
}

/// Everything that changes from frame to frame, owned in one place.
#[derive(Debug)]
pub struct CameraRuntimeState {
    pub pose: CameraPose,
    pub control: ControlMode,
    pub zoom: ZoomController,
}

impl CameraRuntimeState {
    pub fn new(rotate_speed: f32) -> Self {
        Self {
            pose: CameraPose::default(),
            control: ControlMode::Orbit(OrbitControls::new(rotate_speed)),
            zoom: ZoomController::default(),
        }
    }

    pub fn motion_active(&self) -> bool {
        matches!(self.control, ControlMode::OrientationFusion(_))
    }

    /// Swap the orientation owner. Dropping the fusion unit detaches the
    /// sensor; the orbit control picks up the current heading.
    pub fn set_motion(&mut self, enabled: bool, mailbox: &SensorMailbox, rotate_speed: f32) {
        if enabled == self.motion_active() {
            return;
        }
        self.control = if enabled {
            ControlMode::OrientationFusion(OrientationFusion::attach(
                mailbox.clone(),
                self.pose.orientation,
            ))
        } else {
            let mut orbit = OrbitControls::new(rotate_speed);
            orbit.sync_to(&mut self.pose);
            ControlMode::Orbit(orbit)
        };
        log::debug!("camera control: {}", if enabled { "orientation fusion" } else { "orbit" });
    }

    /// Drag input. Ignored while motion control owns the orientation.
    pub fn drag(&mut self, delta: Vec2) {
        if let ControlMode::Orbit(orbit) = &mut self.control {
            orbit.drag(delta.x, delta.y, &mut self.pose);
        }
    }

    pub fn reset(&mut self) {
        self.pose.reset_to_default();
        self.zoom.end();
        match &mut self.control {
            ControlMode::Orbit(orbit) => orbit.discard_offset(),
            ControlMode::OrientationFusion(fusion) => fusion.jump_to(self.pose.orientation),
        }
    }

    pub fn tick(&mut self) {
        if let ControlMode::OrientationFusion(fusion) = &mut self.control {
            fusion.tick(&mut self.pose);
        }
    }
}

impl GestureSource for CameraRuntimeState {
    fn on_zoom_delta(&mut self, delta_y: f32) {
        self.zoom.wheel(&mut self.pose, delta_y);
    }

    fn on_pinch_begin(&mut self, start_distance: f32) {
        self.zoom.begin(&self.pose, start_distance);
    }

    fn on_pinch(&mut self, start_distance: f32, current_distance: f32) {
        self.zoom.pinch(&mut self.pose, start_distance, current_distance);
    }

    fn on_pinch_end(&mut self) {
        self.zoom.end();
    }
}

/// What the renderer needs for one displayed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameState {
    pub pose: CameraPose,
    pub surface_model: Mat4,
    pub material: MaterialBinding,
    pub mode: ProjectionMode,
}

/// The mounted scene: current inputs, surface mesh and camera runtime.
pub struct DomeScene {
    runtime: CameraRuntimeState,
    reset: ResetController,
    inputs: SceneInputs,
    mesh: SurfaceMesh,
    mesh_generation: u64,
    geometry: GeometryConfig,
    rotate_speed: f32,
    mailbox: SensorMailbox,
}

impl DomeScene {
    pub fn new(
        inputs: SceneInputs,
        geometry: GeometryConfig,
        controls: &ControlsConfig,
        mailbox: SensorMailbox,
    ) -> Self {
        let mut runtime = CameraRuntimeState::new(controls.rotate_speed);
        runtime.set_motion(inputs.motion_enabled, &mailbox, controls.rotate_speed);

        Self {
            runtime,
            reset: ResetController::new(inputs.reset_signal),
            mesh: build_surface(inputs.mode, &geometry),
            mesh_generation: 0,
            inputs,
            geometry,
            rotate_speed: controls.rotate_speed,
            mailbox,
        }
    }

    pub fn inputs(&self) -> &SceneInputs {
        &self.inputs
    }

    pub fn runtime(&self) -> &CameraRuntimeState {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut CameraRuntimeState {
        &mut self.runtime
    }

    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// Bumped every time the surface mesh is rebuilt, so the renderer knows
    /// when to re-upload.
    pub fn mesh_generation(&self) -> u64 {
        self.mesh_generation
    }

    /// Apply a new set of external inputs; only what changed takes effect.
    pub fn apply_inputs(&mut self, next: SceneInputs) {
        if next.mode != self.inputs.mode {
            self.mesh = build_surface(next.mode, &self.geometry);
            self.mesh_generation += 1;
            // the viewer stays where they are, only the zoom resets
            self.runtime.pose.set_fov(DEFAULT_FOV);
            log::debug!("projection mode {:?} -> {:?}", self.inputs.mode, next.mode);
        }

        self.runtime.set_motion(next.motion_enabled, &self.mailbox, self.rotate_speed);

        if self.reset.observe(next.reset_signal) {
            self.runtime.reset();
            log::debug!("camera reset (signal {})", next.reset_signal);
        }

        self.inputs = next;
    }

    /// Drag from mouse or a single finger.
    pub fn on_drag(&mut self, delta: Vec2) {
        self.runtime.drag(delta);
    }

    /// Once per displayed frame: advance smoothing and snapshot the frame.
    pub fn render_tick(&mut self) -> FrameState {
        self.runtime.tick();

        FrameState {
            pose: self.runtime.pose,
            surface_model: surface_transform(self.inputs.mode, self.inputs.dome_tilt, &self.geometry),
            material: bind_material(self.inputs.mode, self.inputs.has_frame_source),
            mode: self.inputs.mode,
        }
    }
}

impl Drop for DomeScene {
    fn drop(&mut self) {
        // tear-down: stop listening to the sensor
        self.runtime.set_motion(false, &self.mailbox, self.rotate_speed);
    }
}
