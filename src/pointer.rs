use crate::camera::Camera;
use crate::InteractionParams;
use cgmath::{InnerSpace, Matrix3, Point3, Vector2, Vector3};

/// Pointer position used before the first move event; far outside the
/// `[-1, 1]` viewport.
pub const OFFSCREEN: Vector2<f32> = Vector2::new(-1000.0, -1000.0);

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
  pub origin: Point3<f32>,
  /// Unit length.
  pub direction: Vector3<f32>,
}

/// Points `p` with `normal · p + constant == 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
  pub normal: Vector3<f32>,
  pub constant: f32,
}

impl Plane {
  /// The horizontal `y = 0` plane.
  pub fn horizontal() -> Self {
    Self {
      normal: Vector3::unit_y(),
      constant: 0.0,
    }
  }

  pub fn distance_to(&self, point: Point3<f32>) -> f32 {
    self.normal.dot(point - Point3::new(0.0, 0.0, 0.0)) + self.constant
  }
}

impl Ray {
  /// Forward intersection with `plane`, `None` when parallel or behind.
  pub fn intersect_plane(&self, plane: &Plane) -> Option<Point3<f32>> {
    let denominator = plane.normal.dot(self.direction);
    if denominator == 0.0 {
      // parallel: only a ray lying in the plane touches it
      return if plane.distance_to(self.origin) == 0.0 {
        Some(self.origin)
      } else {
        None
      };
    }
    let t = -plane.distance_to(self.origin) / denominator;
    if t < 0.0 || !t.is_finite() {
      return None;
    }
    Some(self.origin + self.direction * t)
  }
}

/// Maps the 2D pointer onto the interaction plane and keeps an exponentially
/// smoothed target in the field's local space.
#[derive(Clone, Debug)]
pub struct PointerProjector {
  ndc: Vector2<f32>,
  target: Vector3<f32>,
  plane: Plane,
  smoothing: f32,
}

impl PointerProjector {
  pub fn new(params: &InteractionParams) -> Self {
    Self {
      ndc: OFFSCREEN,
      target: Vector3::new(0.0, 0.0, 0.0),
      plane: Plane::horizontal(),
      smoothing: params.smoothing,
    }
  }

  pub fn ndc(&self) -> Vector2<f32> {
    self.ndc
  }

  /// Smoothed target in field-local coordinates.
  pub fn target(&self) -> Vector3<f32> {
    self.target
  }

  pub fn set_ndc(&mut self, ndc: Vector2<f32>) {
    self.ndc = ndc;
  }

  /// Pixel coordinates with the origin at the top-left corner.
  pub fn set_screen_position(&mut self, x: f64, y: f64, width: u32, height: u32) {
    if width == 0 || height == 0 {
      return;
    }
    self.ndc = Vector2::new(
      (x / f64::from(width) * 2.0 - 1.0) as f32,
      (-(y / f64::from(height)) * 2.0 + 1.0) as f32,
    );
  }

  /// Moves the smoothed target one step towards `raw`.
  pub fn smooth_towards(&mut self, raw: Vector3<f32>) {
    self.target += (raw - self.target) * self.smoothing;
  }

  /// Casts the pointer ray and steps the target. `world_to_local` maps world
  /// space into the field's rotating frame. Returns false when the ray misses
  /// the plane; the previous target is kept.
  pub fn update(&mut self, camera: &Camera, world_to_local: &Matrix3<f32>) -> bool {
    let hit = camera
      .ray_through(self.ndc)
      .and_then(|ray| ray.intersect_plane(&self.plane));
    match hit {
      Some(point) => {
        let local = *world_to_local * (point - Point3::new(0.0, 0.0, 0.0));
        self.smooth_towards(local);
        true
      }
      None => false,
    }
  }
}
