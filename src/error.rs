// error.rs — crate-level error type

use std::fmt;

/// Errors produced while setting up the viewer. The per-frame camera and
/// projection code is infallible; everything here happens at startup or when
/// a collaborator hands us something unusable.
#[derive(Debug)]
pub enum ViewerError {
    /// Generic I/O failure (config file, image file).
    Io(std::io::Error),
    /// TOML config could not be parsed.
    ConfigParse(String),
    /// A frame image could not be decoded.
    ImageDecode(String),
    /// Adapter, device or surface creation failed.
    Gpu(String),
    /// Window or event loop creation failed.
    Window(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ImageDecode(msg) => write!(f, "image decode error: {msg}"),
            Self::Gpu(msg) => write!(f, "GPU error: {msg}"),
            Self::Window(msg) => write!(f, "window error: {msg}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ViewerError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::ImageDecode(other.to_string()),
        }
    }
}

impl From<winit::error::OsError> for ViewerError {
    fn from(e: winit::error::OsError) -> Self {
        Self::Window(e.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for ViewerError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Self::Gpu(e.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for ViewerError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        Self::Gpu(e.to_string())
    }
}
