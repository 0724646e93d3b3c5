// mesh.rs — 穹顶 / 平面 / 背景球 网格生成
//
// 坐标约定: Y 向上, 观众默认站在原点附近, 向 -Z 方向为前方。
// 顶点环绕顺序使正面朝向球心, 因此从内部观看时剔除背面即可。

use glam::{Mat4, Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

use crate::camera::DEFAULT_POSITION;
use crate::config::GeometryConfig;
use crate::projection::ProjectionMode;

#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Sphere cap from the zenith down to polar angle `theta_length`.
/// `theta_length = PI` gives a full sphere, `PI / 2` a hemisphere.
/// UVs are the plain lat/long grid parameterization.
pub fn build_sphere_cap(radius: f32, lon: usize, lat: usize, theta_length: f32) -> SurfaceMesh {
    let lon = lon.max(3);
    let lat = lat.max(1);

    let mut positions = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut uvs = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let v = i as f32 / lat as f32;
        let theta = theta_length * v;
        let y = radius * theta.cos();
        let sin_t = theta.sin();

        for j in 0..=lon {
            let u = j as f32 / lon as f32;
            let phi = 2.0 * PI * u;

            positions.push([radius * phi.cos() * sin_t, y, radius * phi.sin() * sin_t]);
            uvs.push([u, 1.0 - v]);
        }
    }

    for i in 0..lat {
        for j in 0..lon {
            let a = (i * (lon + 1) + j) as u32;
            let b = a + (lon + 1) as u32;

            indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
        }
    }

    SurfaceMesh {
        positions,
        uvs,
        indices,
    }
}

/// Equidistant (fisheye) UV for a direction on the dome.
///
/// Returns `(u, v, r)` where `r = theta / PI` is the radial texture distance:
/// 0 at the zenith, 0.5 at the horizon.
pub fn fisheye_uv(position: Vec3) -> (f32, f32, f32) {
    let dir = position.normalize_or_zero();
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let phi = dir.z.atan2(dir.x);
    let r = theta / PI;

    (0.5 + r * phi.cos(), 0.5 + r * phi.sin(), r)
}

/// Hemisphere with its UVs replaced by the fisheye mapping. The mapping is
/// computed once here and stored on the mesh.
pub fn build_dome(radius: f32, width_segments: usize, height_segments: usize) -> SurfaceMesh {
    let mut mesh = build_sphere_cap(radius, width_segments, height_segments, FRAC_PI_2);

    for (uv, p) in mesh.uvs.iter_mut().zip(&mesh.positions) {
        let (u, v, _) = fisheye_uv(Vec3::from_array(*p));
        *uv = [u, v];
    }

    mesh
}

/// Plane in the local XY plane, normal +Z, centred on the origin.
/// UVs run (0,0) bottom-left to (1,1) top-right.
pub fn build_plane(width: f32, height: f32) -> SurfaceMesh {
    let hw = width * 0.5;
    let hh = height * 0.5;

    SurfaceMesh {
        positions: vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

pub fn build_surface(mode: ProjectionMode, geometry: &GeometryConfig) -> SurfaceMesh {
    match mode {
        ProjectionMode::Dome => build_dome(
            geometry.dome_radius,
            geometry.width_segments,
            geometry.height_segments,
        ),
        ProjectionMode::Flat => build_plane(geometry.flat_width, geometry.flat_height),
    }
}

pub fn tilt_radians(tilt_degrees: i32) -> f32 {
    tilt_degrees as f32 * (PI / 180.0)
}

/// Rigid transform applied to the whole surface group.
///
/// Dome: rotation by the tilt about the horizontal axis. Flat: lifted above
/// the standing point, turned to face down, then spun 180° about the vertical
/// axis so it mirrors the same way the dome does. Tilt is ignored for Flat.
pub fn surface_transform(mode: ProjectionMode, tilt_degrees: i32, geometry: &GeometryConfig) -> Mat4 {
    match mode {
        ProjectionMode::Dome => Mat4::from_rotation_x(tilt_radians(tilt_degrees)),
        ProjectionMode::Flat => {
            let position = Vec3::new(DEFAULT_POSITION.x, geometry.flat_elevation, DEFAULT_POSITION.z);
            let rotation = Quat::from_rotation_y(PI) * Quat::from_rotation_x(FRAC_PI_2);
            Mat4::from_rotation_translation(rotation, position)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn dome_uvs_stay_inside_unit_square() {
        let mesh = build_dome(10.0, 48, 24);
        for (p, uv) in mesh.positions.iter().zip(&mesh.uvs) {
            let (_, _, r) = fisheye_uv(Vec3::from_array(*p));
            assert!((-EPS..=0.5 + EPS).contains(&r), "r = {r}");
            assert!((-EPS..=1.0 + EPS).contains(&uv[0]), "u = {}", uv[0]);
            assert!((-EPS..=1.0 + EPS).contains(&uv[1]), "v = {}", uv[1]);
        }
    }

    #[test]
    fn zenith_ring_maps_to_texture_centre() {
        let lon = 32;
        let mesh = build_dome(5.0, lon, 16);
        for uv in &mesh.uvs[..=lon] {
            assert!((uv[0] - 0.5).abs() < EPS);
            assert!((uv[1] - 0.5).abs() < EPS);
        }
    }

    #[test]
    fn horizon_ring_sits_on_half_radius() {
        let lon = 32;
        let lat = 16;
        let mesh = build_dome(5.0, lon, lat);
        let start = lat * (lon + 1);
        for uv in &mesh.uvs[start..] {
            let d = ((uv[0] - 0.5).powi(2) + (uv[1] - 0.5).powi(2)).sqrt();
            assert!((d - 0.5).abs() < 1e-4, "d = {d}");
        }
    }

    #[test]
    fn fisheye_radius_is_linear_in_polar_angle() {
        let theta = 30f32.to_radians();
        let p = Vec3::new(theta.sin(), theta.cos(), 0.0);
        let (u, v, r) = fisheye_uv(p);
        assert!((r - 30.0 / 180.0).abs() < EPS);
        assert!((u - (0.5 + r)).abs() < EPS);
        assert!((v - 0.5).abs() < EPS);
    }

    #[test]
    fn dome_never_goes_below_horizon() {
        let mesh = build_dome(10.0, 16, 8);
        assert!(mesh.positions.iter().all(|p| p[1] >= -EPS));
        assert_eq!(mesh.indices.len(), 16 * 8 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn front_faces_point_inward() {
        let mesh = build_dome(1.0, 16, 8);
        // first triangle below the zenith row
        let base = 16 * 6;
        let [a, b, c] = [0, 1, 2].map(|k| Vec3::from_array(mesh.positions[mesh.indices[base + k] as usize]));
        let normal = (b - a).cross(c - a);
        let centroid = (a + b + c) / 3.0;
        assert!(normal.dot(centroid) < 0.0);
    }

    #[test]
    fn tilt_is_exact_degree_conversion() {
        for deg in [-180, -90, -45, 0, 1, 37, 90, 135, 720] {
            assert_eq!(tilt_radians(deg), deg as f32 * (PI / 180.0));
        }
    }

    #[test]
    fn dome_transform_rotates_about_horizontal_axis() {
        let geometry = GeometryConfig::default();
        let m = surface_transform(ProjectionMode::Dome, 90, &geometry);
        let up = m.transform_vector3(Vec3::Y);
        assert!((up - Vec3::Z).length() < EPS);
        let side = m.transform_vector3(Vec3::X);
        assert!((side - Vec3::X).length() < EPS);
    }

    #[test]
    fn flat_ignores_tilt_and_faces_down() {
        let geometry = GeometryConfig::default();
        let a = surface_transform(ProjectionMode::Flat, 0, &geometry);
        let b = surface_transform(ProjectionMode::Flat, 60, &geometry);
        assert_eq!(a, b);

        let normal = a.transform_vector3(Vec3::Z);
        assert!((normal - Vec3::NEG_Y).length() < EPS);

        let centre = a.transform_point3(Vec3::ZERO);
        assert!((centre.y - geometry.flat_elevation).abs() < EPS);
        assert!((centre.x - DEFAULT_POSITION.x).abs() < EPS);
        assert!((centre.z - DEFAULT_POSITION.z).abs() < EPS);
    }

    #[test]
    fn plane_uvs_are_linear_corners() {
        let mesh = build_plane(4.0, 2.0);
        assert_eq!(mesh.positions[0], [-2.0, -1.0, 0.0]);
        assert_eq!(mesh.uvs[2], [1.0, 1.0]);
        assert_eq!(mesh.indices.len(), 6);
    }
}
