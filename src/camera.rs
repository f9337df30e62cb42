use crate::pointer::Ray;
use crate::{CameraParams, FlyInParams};
use cgmath::{InnerSpace, Point3, SquareMatrix, Vector2, Vector3, Vector4};
use std::f32::consts::{PI, TAU};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLE_EPSILON: f32 = 1e-4;

pub struct Camera {
  pub eye: cgmath::Point3<f32>,
  pub target: cgmath::Point3<f32>,
  pub up: cgmath::Vector3<f32>,
  pub aspect: f32,
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
}

impl Camera {
  pub fn new(eye: Point3<f32>, aspect: f32, params: &CameraParams) -> Self {
    Self {
      eye,
      target: Point3::new(0.0, 0.0, 0.0),
      up: cgmath::Vector3::unit_y(),
      aspect,
      fovy: params.fovy,
      znear: params.znear,
      zfar: params.zfar,
    }
  }

  pub fn set_viewport(&mut self, width: u32, height: u32) {
    if width > 0 && height > 0 {
      self.aspect = width as f32 / height as f32;
    }
  }

  pub fn distance(&self) -> f32 {
    (self.eye - self.target).magnitude()
  }

  fn view_projection(&self) -> cgmath::Matrix4<f32> {
    let view = cgmath::Matrix4::look_at_rh(self.eye, self.target, self.up);
    let proj = cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar);
    proj * view
  }

  fn build_view_projection_matrix(&self) -> cgmath::Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * self.view_projection()
  }

  /// Ray from the eye through a point in normalized device coordinates.
  pub fn ray_through(&self, ndc: Vector2<f32>) -> Option<Ray> {
    let inverse = self.view_projection().invert()?;
    let clip = inverse * Vector4::new(ndc.x, ndc.y, 0.5, 1.0);
    if clip.w == 0.0 {
      return None;
    }
    let point = Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
    let direction = point - self.eye;
    if direction.magnitude2() == 0.0 || !direction.magnitude2().is_finite() {
      return None;
    }
    Some(Ray {
      origin: self.eye,
      direction: direction.normalize(),
    })
  }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
  view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
  pub fn new() -> Self {
    Self {
      view_proj: cgmath::Matrix4::identity().into(),
    }
  }

  pub fn update_view_proj(&mut self, camera: &Camera) {
    self.view_proj = camera.build_view_projection_matrix().into();
  }
}

impl Default for CameraUniform {
  fn default() -> Self {
    Self::new()
  }
}

/// Drag-to-orbit and wheel zoom around the camera target, with damping.
/// Panning is not supported.
pub struct OrbitController {
  rotate_speed: f32,
  zoom_speed: f32,
  damping: f32,
  min_distance: f32,
  max_distance: f32,
  delta_theta: f32,
  delta_phi: f32,
  scale: f32,
  is_dragging: bool,
  last_cursor: Option<(f64, f64)>,
  viewport_height: u32,
}

impl OrbitController {
  pub fn init(params: &CameraParams) -> Self {
    Self {
      rotate_speed: params.rotate_speed,
      zoom_speed: params.zoom_speed,
      damping: params.damping,
      min_distance: params.min_distance,
      max_distance: params.max_distance,
      delta_theta: 0.0,
      delta_phi: 0.0,
      scale: 1.0,
      is_dragging: false,
      last_cursor: None,
      viewport_height: 1,
    }
  }

  pub fn set_viewport_height(&mut self, height: u32) {
    self.viewport_height = height.max(1);
  }

  /// Queues a rotation for a drag of `dx`, `dy` pixels.
  pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32) {
    let height = self.viewport_height as f32;
    self.delta_theta -= TAU * dx / height * self.rotate_speed;
    self.delta_phi -= TAU * dy / height * self.rotate_speed;
  }

  /// Positive steps move towards the target.
  pub fn zoom(&mut self, steps: f32) {
    self.scale *= 0.95f32.powf(self.zoom_speed * steps);
  }

  fn drag_to(&mut self, x: f64, y: f64) {
    if let Some((last_x, last_y)) = self.last_cursor {
      if self.is_dragging {
        self.rotate_by_pixels((x - last_x) as f32, (y - last_y) as f32);
      }
    }
    self.last_cursor = Some((x, y));
  }

  pub fn process_events(&mut self, event: &WindowEvent) -> bool {
    match event {
      WindowEvent::MouseInput {
        state,
        button: MouseButton::Left,
        ..
      } => {
        self.is_dragging = *state == ElementState::Pressed;
        true
      }
      WindowEvent::CursorMoved { position, .. } => {
        self.drag_to(position.x, position.y);
        // the pointer projector also listens to cursor moves
        false
      }
      WindowEvent::MouseWheel { delta, .. } => {
        let steps = match delta {
          MouseScrollDelta::LineDelta(_, y) => *y,
          MouseScrollDelta::PixelDelta(pos) => (pos.y / 50.0) as f32,
        };
        self.zoom(steps);
        true
      }
      WindowEvent::Touch(touch) => {
        match touch.phase {
          TouchPhase::Started => {
            self.is_dragging = true;
            self.last_cursor = Some((touch.location.x, touch.location.y));
          }
          TouchPhase::Moved => self.drag_to(touch.location.x, touch.location.y),
          TouchPhase::Ended | TouchPhase::Cancelled => {
            self.is_dragging = false;
            self.last_cursor = None;
          }
        }
        false
      }
      _ => false,
    }
  }

  /// Applies accumulated input to `camera`, decaying it by the damping factor.
  pub fn update_camera(&mut self, camera: &mut Camera) {
    let offset = camera.eye - camera.target;
    let radius = offset.magnitude();
    if radius == 0.0 {
      return;
    }
    let mut theta = offset.x.atan2(offset.z);
    let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

    theta += self.delta_theta * self.damping;
    phi += self.delta_phi * self.damping;
    phi = phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);
    let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

    let sin_phi = phi.sin();
    camera.eye = camera.target
      + Vector3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
      );

    self.delta_theta *= 1.0 - self.damping;
    self.delta_phi *= 1.0 - self.damping;
    self.scale = 1.0;
  }
}

/// `1 - 2^(-10t)`, pinned to exactly 1 at the end.
pub fn ease_out_expo(t: f32) -> f32 {
  let t = t.clamp(0.0, 1.0);
  if t >= 1.0 {
    1.0
  } else {
    1.0 - 2f32.powf(-10.0 * t)
  }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlyInSample {
  pub height: f32,
  pub distance: f32,
  pub rotation_speed: f32,
}

/// Scripted approach: eye height and distance shrink while the field's spin
/// decays from fast to its steady value.
#[derive(Clone, Debug)]
pub struct FlyIn {
  params: FlyInParams,
}

impl FlyIn {
  pub fn new(params: &FlyInParams) -> Self {
    Self { params: *params }
  }

  pub fn is_enabled(&self) -> bool {
    self.params.enabled
  }

  /// Eye position at the start of the loop.
  pub fn initial_eye(&self) -> Point3<f32> {
    let s = self.sample(0.0);
    Point3::new(0.0, s.height, s.distance)
  }

  pub fn is_finished(&self, elapsed: f32) -> bool {
    !self.params.enabled || elapsed >= self.params.duration
  }

  pub fn sample(&self, elapsed: f32) -> FlyInSample {
    let p = &self.params;
    if !p.enabled {
      return FlyInSample {
        height: p.end_height,
        distance: p.end_distance,
        rotation_speed: p.steady_rotation_speed,
      };
    }
    let progress = if p.duration > 0.0 {
      ease_out_expo(elapsed / p.duration)
    } else {
      1.0
    };
    let lerp = |from: f32, to: f32| from * (1.0 - progress) + to * progress;
    FlyInSample {
      height: lerp(p.start_height, p.end_height),
      distance: lerp(p.start_distance, p.end_distance),
      rotation_speed: lerp(p.start_rotation_speed, p.steady_rotation_speed),
    }
  }

  /// Moves the eye along the approach; only height and depth are animated.
  pub fn apply(&self, camera: &mut Camera, elapsed: f32) -> FlyInSample {
    let sample = self.sample(elapsed);
    camera.eye.y = sample.height;
    camera.eye.z = sample.distance;
    sample
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> CameraParams {
    CameraParams::default()
  }

  #[test]
  fn ease_endpoints() {
    assert_eq!(ease_out_expo(0.0), 0.0);
    assert_eq!(ease_out_expo(1.0), 1.0);
    assert_eq!(ease_out_expo(2.0), 1.0);
    let mut prev = 0.0;
    for i in 1..100 {
      let v = ease_out_expo(i as f32 / 100.0);
      assert!(v > prev);
      prev = v;
    }
  }

  #[test]
  fn fly_in_approaches_and_settles() {
    let fly_in = FlyIn::new(&FlyInParams::default());
    let start = fly_in.sample(0.0);
    assert_eq!(start.distance, 120.0);
    assert_eq!(start.height, 20.0);
    assert_eq!(start.rotation_speed, 20.0);

    let mid = fly_in.sample(1.0);
    assert!(mid.distance < 120.0 && mid.distance > 21.0);
    assert!(mid.rotation_speed < 20.0 && mid.rotation_speed > 0.05);

    let end = fly_in.sample(2.5);
    assert_eq!(end.distance, 21.0);
    assert_eq!(end.height, 4.0);
    assert_eq!(end.rotation_speed, 0.05);
    assert_eq!(fly_in.sample(100.0), end);
    assert!(fly_in.is_finished(2.5));
    assert!(!fly_in.is_finished(2.4));
  }

  #[test]
  fn disabled_fly_in_starts_at_rest() {
    let fly_in = FlyIn::new(&FlyInParams {
      enabled: false,
      ..FlyInParams::default()
    });
    assert_eq!(fly_in.initial_eye(), Point3::new(0.0, 4.0, 21.0));
    assert_eq!(fly_in.sample(0.0).rotation_speed, 0.05);
    assert!(fly_in.is_finished(0.0));
  }

  #[test]
  fn orbit_without_input_keeps_eye() {
    let mut camera = Camera::new(Point3::new(3.0, 4.0, 21.0), 1.5, &params());
    let mut controller = OrbitController::init(&params());
    controller.update_camera(&mut camera);
    assert!((camera.eye - Point3::new(3.0, 4.0, 21.0)).magnitude() < 1e-4);
  }

  #[test]
  fn drag_rotates_with_damping() {
    let mut camera = Camera::new(Point3::new(0.0, 4.0, 21.0), 1.0, &params());
    let mut controller = OrbitController::init(&params());
    controller.set_viewport_height(800);
    controller.rotate_by_pixels(100.0, 0.0);
    let distance = camera.distance();

    controller.update_camera(&mut camera);
    let first = camera.eye;
    assert!(first.x < 0.0, "dragging right orbits left: {first:?}");
    assert!((camera.distance() - distance).abs() < 1e-3);

    controller.update_camera(&mut camera);
    let second_step = (camera.eye - first).magnitude();
    let first_step = (first - Point3::new(0.0, 4.0, 21.0)).magnitude();
    assert!(second_step > 0.0 && second_step < first_step);
  }

  #[test]
  fn zoom_is_clamped() {
    let mut camera = Camera::new(Point3::new(0.0, 0.0, 21.0), 1.0, &params());
    let mut controller = OrbitController::init(&params());
    controller.zoom(1.0);
    controller.update_camera(&mut camera);
    assert!((camera.distance() - 21.0 * 0.95).abs() < 1e-3);
    controller.zoom(1000.0);
    controller.update_camera(&mut camera);
    assert!((camera.distance() - params().min_distance).abs() < 1e-3);
  }

  #[test]
  fn polar_angle_never_flips() {
    let mut camera = Camera::new(Point3::new(0.0, 4.0, 21.0), 1.0, &params());
    let mut controller = OrbitController::init(&params());
    controller.set_viewport_height(100);
    controller.rotate_by_pixels(0.0, 10_000.0);
    for _ in 0..200 {
      controller.update_camera(&mut camera);
      assert!(camera.eye.y.is_finite());
      assert!(camera.eye.y <= camera.distance() + 1e-3);
    }
    assert!(camera.eye.y > 0.0);
  }

  #[test]
  fn aspect_follows_viewport() {
    let mut camera = Camera::new(Point3::new(0.0, 4.0, 21.0), 1.0, &params());
    camera.set_viewport(1920, 1080);
    assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    camera.set_viewport(0, 1080);
    assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
  }

  #[test]
  fn ray_through_centre_points_at_target() {
    let camera = Camera::new(Point3::new(0.0, 4.0, 21.0), 1.0, &params());
    let ray = camera.ray_through(Vector2::new(0.0, 0.0)).unwrap();
    let towards = (camera.target - camera.eye).normalize();
    assert!((ray.direction - towards).magnitude() < 1e-4);
    assert_eq!(ray.origin, camera.eye);
  }
}
