pub mod camera;
pub mod clock;
pub mod config;
pub mod error;
pub mod field;
pub mod headless;
pub mod initialize;
pub mod lifecycle;
pub mod pointer;
pub mod render;
pub mod scene;
pub mod state;

use serde::Deserialize;
use std::f32::consts::PI;

/// Shape of the generated point cloud: a thin spherical halo around a
/// radially biased disk.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldParams {
  pub halo_count: u32,
  pub disk_count: u32,
  pub halo_inner_radius: f32,
  pub halo_outer_radius: f32,
  pub disk_inner_radius: f32,
  pub disk_outer_radius: f32,
  pub disk_half_height: f32,
  /// Exponent applied to the uniform draw that blends inner and outer radius.
  pub radial_exponent: f32,
  /// Fixed seed for reproducible fields; entropy when absent.
  pub seed: Option<u64>,
}

impl Default for FieldParams {
  fn default() -> Self {
    Self {
      halo_count: 50_000,
      disk_count: 100_000,
      halo_inner_radius: 9.5,
      halo_outer_radius: 10.0,
      disk_inner_radius: 10.0,
      disk_outer_radius: 40.0,
      disk_half_height: 1.0,
      radial_exponent: 1.5,
      seed: None,
    }
  }
}

impl FieldParams {
  pub fn particle_count(&self) -> usize {
    self.halo_count as usize + self.disk_count as usize
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionParams {
  /// Particles closer than this to the pointer target are pushed away.
  pub radius: f32,
  /// Push distance at zero separation.
  pub strength: f32,
  /// Per-frame lerp factor of the smoothed pointer target.
  pub smoothing: f32,
}

impl Default for InteractionParams {
  fn default() -> Self {
    Self {
      radius: 6.0,
      strength: 3.0,
      smoothing: 0.1,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraParams {
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
  pub rotate_speed: f32,
  pub zoom_speed: f32,
  pub damping: f32,
  pub min_distance: f32,
  pub max_distance: f32,
}

impl Default for CameraParams {
  fn default() -> Self {
    Self {
      fovy: 60.0,
      znear: 1.0,
      zfar: 2000.0,
      rotate_speed: 1.0,
      zoom_speed: 1.0,
      damping: 0.05,
      min_distance: 2.0,
      max_distance: 1000.0,
    }
  }
}

/// Scripted camera approach played once when the loop starts.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlyInParams {
  pub enabled: bool,
  pub duration: f32,
  pub start_distance: f32,
  pub end_distance: f32,
  pub start_height: f32,
  pub end_height: f32,
  pub start_rotation_speed: f32,
  pub steady_rotation_speed: f32,
}

impl Default for FlyInParams {
  fn default() -> Self {
    Self {
      enabled: true,
      duration: 2.5,
      start_distance: 120.0,
      end_distance: 21.0,
      start_height: 20.0,
      end_height: 4.0,
      start_rotation_speed: 20.0,
      steady_rotation_speed: 0.05,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderParams {
  /// World-space sprite size before the per-particle multiplier.
  pub point_size: f32,
  /// Seconds of wall time to shader time.
  pub time_scale: f32,
  /// Fixed tilt of the field about Z, radians.
  pub tilt: f32,
  /// sRGB background colour.
  pub background: [u8; 3],
}

impl Default for RenderParams {
  fn default() -> Self {
    Self {
      point_size: 0.125,
      time_scale: 0.5 * PI,
      tilt: 0.2,
      background: [0x16, 0x00, 0x16],
    }
  }
}

/// Per-instance vertex data; never changes after generation.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
  pub pos: [f32; 3],
  pub size: f32,
  /// `(theta0, phi0, angular_speed, radius)`
  pub phase: [f32; 4],
}

/// Per-frame inputs of the displacement program. Layout matches `Field` in
/// `shaders/draw.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FieldUniform {
  pub model: [[f32; 4]; 4],
  pub pointer: [f32; 3],
  pub time: f32,
  pub aspect: f32,
  pub point_size: f32,
  pub interaction_radius: f32,
  pub interaction_strength: f32,
}
