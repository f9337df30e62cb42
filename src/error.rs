use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum GalaxyError {
  /// A required rendering capability is missing (no adapter, no usable
  /// surface configuration).
  Initialization { reason: String },
  Surface(wgpu::CreateSurfaceError),
  Device(wgpu::RequestDeviceError),
  EventLoop(winit::error::EventLoopError),
  Window(winit::error::OsError),
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  Config {
    path: PathBuf,
    source: toml::de::Error,
  },
}

impl GalaxyError {
  pub fn initialization(reason: impl Into<String>) -> Self {
    GalaxyError::Initialization {
      reason: reason.into(),
    }
  }
}

impl fmt::Display for GalaxyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GalaxyError::Initialization { reason } => {
        write!(f, "rendering unavailable: {reason}")
      }
      GalaxyError::Surface(err) => write!(f, "failed to create surface: {err}"),
      GalaxyError::Device(err) => write!(f, "failed to open device: {err}"),
      GalaxyError::EventLoop(err) => write!(f, "event loop error: {err}"),
      GalaxyError::Window(err) => write!(f, "failed to create window: {err}"),
      GalaxyError::Io { path, source } => {
        write!(f, "cannot read '{}': {source}", path.display())
      }
      GalaxyError::Config { path, source } => {
        write!(f, "invalid config '{}': {source}", path.display())
      }
    }
  }
}

impl std::error::Error for GalaxyError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      GalaxyError::Initialization { .. } => None,
      GalaxyError::Surface(err) => Some(err),
      GalaxyError::Device(err) => Some(err),
      GalaxyError::EventLoop(err) => Some(err),
      GalaxyError::Window(err) => Some(err),
      GalaxyError::Io { source, .. } => Some(source),
      GalaxyError::Config { source, .. } => Some(source),
    }
  }
}

impl From<wgpu::CreateSurfaceError> for GalaxyError {
  fn from(err: wgpu::CreateSurfaceError) -> Self {
    GalaxyError::Surface(err)
  }
}

impl From<wgpu::RequestDeviceError> for GalaxyError {
  fn from(err: wgpu::RequestDeviceError) -> Self {
    GalaxyError::Device(err)
  }
}

impl From<winit::error::EventLoopError> for GalaxyError {
  fn from(err: winit::error::EventLoopError) -> Self {
    GalaxyError::EventLoop(err)
  }
}

impl From<winit::error::OsError> for GalaxyError {
  fn from(err: winit::error::OsError) -> Self {
    GalaxyError::Window(err)
  }
}

/// A single frame could not be drawn.
#[derive(Debug)]
pub enum FrameError {
  Surface(wgpu::SurfaceError),
  /// The host already released its graphics resources.
  Released,
}

impl fmt::Display for FrameError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FrameError::Surface(err) => write!(f, "surface error: {err}"),
      FrameError::Released => write!(f, "graphics resources already released"),
    }
  }
}

impl std::error::Error for FrameError {}

impl From<wgpu::SurfaceError> for FrameError {
  fn from(err: wgpu::SurfaceError) -> Self {
    FrameError::Surface(err)
  }
}
