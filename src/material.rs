// material.rs — 表面材质选择 (视频纹理 / 程序化渐变) 与背景渐变
//
// 渐变函数是 shaders/*.wgsl 的 CPU 镜像, 只在测试中编译。

use glam::Vec3;

use crate::projection::ProjectionMode;

// sRGB 值, 上传前转线性
pub const DOME_ZENITH_COLOR: Vec3 = Vec3::new(0.118, 0.161, 0.231); // #1e293b dark slate
pub const DOME_HORIZON_COLOR: Vec3 = Vec3::new(0.02, 0.02, 0.02); // #050505
pub const FLAT_FALLBACK_COLOR: Vec3 = Vec3::new(0.067, 0.067, 0.067); // #111111
#[cfg(test)]
pub const GRADIENT_EDGE: f32 = 0.6;

pub const BACKGROUND_TOP_COLOR: Vec3 = Vec3::new(0.102, 0.102, 0.102); // #1a1a1a
pub const BACKGROUND_BOTTOM_COLOR: Vec3 = Vec3::new(0.008, 0.008, 0.008); // #020202
pub const BACKGROUND_OFFSET: f32 = 33.0;
pub const BACKGROUND_EXPONENT: f32 = 0.6;
pub const BACKGROUND_RADIUS: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Live frame, linear filtering, no mipmaps, sRGB.
    VideoTexture,
    /// Radial zenith-to-horizon gradient.
    DomeGradient,
    FlatColor,
}

impl MaterialKind {
    pub fn shader_index(self) -> u32 {
        match self {
            MaterialKind::VideoTexture => 0,
            MaterialKind::DomeGradient => 1,
            MaterialKind::FlatColor => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSides {
    /// Inside of the dome only.
    Interior,
    /// Seen from above and below.
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialBinding {
    pub kind: MaterialKind,
    pub sides: FaceSides,
}

pub fn bind_material(mode: ProjectionMode, has_frame_source: bool) -> MaterialBinding {
    let sides = match mode {
        ProjectionMode::Dome => FaceSides::Interior,
        ProjectionMode::Flat => FaceSides::Double,
    };
    let kind = match (has_frame_source, mode) {
        (true, _) => MaterialKind::VideoTexture,
        (false, ProjectionMode::Dome) => MaterialKind::DomeGradient,
        (false, ProjectionMode::Flat) => MaterialKind::FlatColor,
    };
    MaterialBinding { kind, sides }
}

#[cfg(test)]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
pub fn dome_gradient_mix(uv: [f32; 2]) -> f32 {
    let dist = ((uv[0] - 0.5).powi(2) + (uv[1] - 0.5).powi(2)).sqrt();
    smoothstep(0.0, GRADIENT_EDGE, dist)
}

#[cfg(test)]
pub fn dome_gradient(uv: [f32; 2]) -> Vec3 {
    DOME_ZENITH_COLOR.lerp(DOME_HORIZON_COLOR, dome_gradient_mix(uv))
}

#[cfg(test)]
pub fn background_gradient(world_pos: Vec3) -> Vec3 {
    let h = (world_pos + Vec3::new(0.0, BACKGROUND_OFFSET, 0.0)).normalize_or_zero().y;
    BACKGROUND_BOTTOM_COLOR.lerp(BACKGROUND_TOP_COLOR, h.max(0.0).powf(BACKGROUND_EXPONENT))
}

pub fn srgb_to_linear(c: Vec3) -> [f32; 4] {
    fn channel(v: f32) -> f32 {
        if v <= 0.04045 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    }
    [channel(c.x), channel(c.y), channel(c.z), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dome_without_source_uses_gradient() {
        let binding = bind_material(ProjectionMode::Dome, false);
        assert_eq!(binding.kind, MaterialKind::DomeGradient);
        assert_eq!(binding.sides, FaceSides::Interior);
    }

    #[test]
    fn flat_without_source_uses_plain_color() {
        let binding = bind_material(ProjectionMode::Flat, false);
        assert_eq!(binding.kind, MaterialKind::FlatColor);
        assert_eq!(binding.sides, FaceSides::Double);
    }

    #[test]
    fn any_source_binds_video() {
        for mode in [ProjectionMode::Dome, ProjectionMode::Flat] {
            assert_eq!(bind_material(mode, true).kind, MaterialKind::VideoTexture);
        }
        assert_eq!(bind_material(ProjectionMode::Flat, true).sides, FaceSides::Double);
    }

    #[test]
    fn gradient_runs_from_zenith_to_horizon() {
        assert_eq!(dome_gradient_mix([0.5, 0.5]), 0.0);
        assert_eq!(dome_gradient([0.5, 0.5]), DOME_ZENITH_COLOR);
        // past the 0.6 edge the mix saturates
        assert_eq!(dome_gradient_mix([1.0, 1.0]), 1.0);
        assert!((dome_gradient([1.0, 1.0]) - DOME_HORIZON_COLOR).length() < 1e-6);

        let mid = dome_gradient_mix([0.8, 0.5]);
        assert!((mid - smoothstep(0.0, 0.6, 0.3)).abs() < 1e-6);
        assert!((mid - 0.5).abs() < 1e-5);
    }

    #[test]
    fn smoothstep_is_clamped_and_symmetric() {
        assert_eq!(smoothstep(0.0, 1.0, -2.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 3.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.25) + smoothstep(0.0, 1.0, 0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn background_is_bottom_color_below_offset() {
        let below = background_gradient(Vec3::new(0.0, -400.0, 0.0));
        assert_eq!(below, BACKGROUND_BOTTOM_COLOR);

        let above = background_gradient(Vec3::new(0.0, 400.0, 0.0));
        assert!((above - BACKGROUND_TOP_COLOR).length() < 1e-6);

        let horizon = background_gradient(Vec3::new(500.0, 0.0, 0.0));
        assert!(horizon.x > BACKGROUND_BOTTOM_COLOR.x && horizon.x < BACKGROUND_TOP_COLOR.x);
    }

    #[test]
    fn linear_conversion_keeps_black_and_white() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), [0.0, 0.0, 0.0, 1.0]);
        let white = srgb_to_linear(Vec3::ONE);
        assert!((white[0] - 1.0).abs() < 1e-5);
    }
}
