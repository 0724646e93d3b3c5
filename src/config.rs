//! Viewer configuration with TOML file support.
//!
//! Every section uses `#[serde(default)]` so a partial file (e.g. only
//! overriding `[scene]`) works. Missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ViewerError;
use crate::projection::ProjectionMode;

pub const DEFAULT_CONFIG_FILE: &str = "fulldome.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub scene: SceneConfig,
    pub geometry: GeometryConfig,
    pub controls: ControlsConfig,
    pub display: DisplayConfig,
}

/// Initial values for the externally supplied scene inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub mode: ProjectionMode,
    pub dome_tilt: i32,
    pub motion_enabled: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Dome,
            dome_tilt: 0,
            motion_enabled: false,
        }
    }
}

/// Mesh resolution and placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometryConfig {
    pub dome_radius: f32,
    pub width_segments: usize,
    pub height_segments: usize,
    pub flat_width: f32,
    pub flat_height: f32,
    /// Height of the flat plane above the viewer.
    pub flat_elevation: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            dome_radius: 10.0,
            width_segments: 64,
            height_segments: 32,
            flat_width: 16.0,
            flat_height: 9.0,
            flat_elevation: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlsConfig {
    /// Orbit drag speed, radians per pixel.
    pub rotate_speed: f32,
    /// Pixels reported per wheel "line" notch.
    pub wheel_line_pixels: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            wheel_line_pixels: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub vsync: bool,
    pub lang: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            lang: "en".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Load from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if given, else `fulldome.toml` in the working dir if it
    /// exists, else defaults. An explicit path that fails to load is an error.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ViewerError> {
        if let Some(p) = path {
            return Self::load(p);
        }

        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if !fallback.exists() {
            return Ok(Self::default());
        }

        match Self::load(&fallback) {
            Ok(cfg) => Ok(cfg),
            Err(e) => {
                log::warn!("ignoring {}: {e}", fallback.display());
                Ok(Self::default())
            }
        }
    }
}

/// Command-line options. Hand-parsed; unknown flags are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub lang: Option<String>,
    pub image: Option<PathBuf>,
    pub sensor_stdin: bool,
}

impl CliArgs {
    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Self::default();
        let mut it = args.into_iter().map(Into::into);
        while let Some(a) = it.next() {
            match a.as_str() {
                "--config" => out.config = it.next().map(PathBuf::from),
                "--lang" => out.lang = it.next(),
                "--image" => out.image = it.next().map(PathBuf::from),
                "--sensor-stdin" => out.sensor_stdin = true,
                _ => {}
            }
        }
        out
    }
}
