// projection.rs — 投影模式与外部输入

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    #[default]
    Dome, // 半球穹顶, fisheye 等距映射
    Flat, // 头顶平面
}

impl ProjectionMode {
    pub fn toggled(self) -> Self {
        match self {
            ProjectionMode::Dome => ProjectionMode::Flat,
            ProjectionMode::Flat => ProjectionMode::Dome,
        }
    }
}

/// Everything the surrounding application pushes into the scene.
///
/// The scene never writes back into this; it only diffs successive values
/// against what it last applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneInputs {
    pub mode: ProjectionMode,
    /// Degrees about the horizontal axis. Nominally [-90, 90], not clamped here.
    pub dome_tilt: i32,
    pub motion_enabled: bool,
    /// Monotonic counter; each increment requests one reset.
    pub reset_signal: u64,
    /// True only when a frame is bound and playback is healthy.
    pub has_frame_source: bool,
}

impl Default for SceneInputs {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Dome,
            dome_tilt: 0,
            motion_enabled: false,
            reset_signal: 0,
            has_frame_source: false,
        }
    }
}
