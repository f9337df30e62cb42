use crate::initialize::ParticleSet;
use crate::InteractionParams;
use cgmath::{InnerSpace, Vector2, Vector3, Vector4};
use std::f32::consts::TAU;

/// Colour at the centre of the field.
pub const WARM: Vector3<f32> = Vector3::new(227.0 / 255.0, 155.0 / 255.0, 0.0);
/// Colour at the rim of the field.
pub const COOL: Vector3<f32> = Vector3::new(100.0 / 255.0, 50.0 / 255.0, 1.0);
/// Per-axis extent used to normalise distance from the origin; the field is
/// wide in X and Z and thin in Y.
pub const EXTENT: Vector3<f32> = Vector3::new(40.0, 10.0, 40.0);
/// Sprite radius where the fade starts and where it reaches zero.
pub const SPRITE_FADE: Vector2<f32> = Vector2::new(0.1, 0.5);

/// Pointer repulsion in the field's local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Repulsion {
  pub target: Vector3<f32>,
  pub radius: f32,
  pub strength: f32,
}

impl Repulsion {
  pub fn new(target: Vector3<f32>, params: &InteractionParams) -> Self {
    Self {
      target,
      radius: params.radius,
      strength: params.strength,
    }
  }

  /// Pushes `position` away from the target when inside the radius.
  pub fn apply(&self, position: Vector3<f32>) -> Vector3<f32> {
    let offset = position - self.target;
    let dist = offset.magnitude();
    // coincident points have no direction to be pushed in
    if dist >= self.radius || dist <= 0.0 {
      return position;
    }
    let falloff = 1.0 - dist / self.radius;
    position + offset / dist * (falloff * falloff * self.strength)
  }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
  pub position: Vector3<f32>,
  pub color: Vector4<f32>,
}

/// Angle reduced into `[0, TAU)` for any finite input.
pub fn wrap_angle(x: f32) -> f32 {
  let wrapped = x.rem_euclid(TAU);
  // a tiny negative remainder rounds up to TAU
  if wrapped >= TAU {
    0.0
  } else {
    wrapped
  }
}

/// Orbital offset of a particle at shader time `t`.
pub fn orbit(phase: Vector4<f32>, t: f32) -> Vector3<f32> {
  let move_t = wrap_angle(phase.x + phase.z * t);
  let move_s = wrap_angle(phase.y + phase.z * t);
  Vector3::new(
    move_s.cos() * move_t.sin(),
    move_t.cos(),
    move_s.sin() * move_t.sin(),
  ) * phase.w
}

/// Blend from [`WARM`] to [`COOL`] by normalised distance `d`.
pub fn color_for_distance(d: f32) -> Vector3<f32> {
  let d = d.clamp(0.0, 1.0);
  WARM + (COOL - WARM) * d
}

pub fn color_at(base: Vector3<f32>) -> Vector3<f32> {
  let scaled = Vector3::new(
    base.x.abs() / EXTENT.x,
    base.y.abs() / EXTENT.y,
    base.z.abs() / EXTENT.z,
  );
  color_for_distance(scaled.magnitude())
}

/// Final position and colour of one particle. Mirrors `main_vs` in
/// `shaders/draw.wgsl`.
pub fn displace(
  base: Vector3<f32>,
  phase: Vector4<f32>,
  t: f32,
  repulsion: &Repulsion,
) -> Vertex {
  let position = repulsion.apply(base + orbit(phase, t));
  Vertex {
    position,
    color: color_at(base).extend(1.0),
  }
}

/// Runs [`displace`] over the whole set.
pub fn evaluate(set: &ParticleSet, t: f32, repulsion: &Repulsion) -> Vec<Vertex> {
  set
    .positions()
    .iter()
    .zip(set.phases())
    .map(|(&base, &phase)| displace(base, phase, t, repulsion))
    .collect()
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
  let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
  t * t * (3.0 - 2.0 * t)
}

/// Opacity of a point sprite at sprite coordinate `uv` in `[0, 1]^2`.
pub fn sprite_alpha(uv: Vector2<f32>) -> f32 {
  let d = (uv - Vector2::new(0.5, 0.5)).magnitude();
  1.0 - smoothstep(SPRITE_FADE.x, SPRITE_FADE.y, d)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_pointer() -> Repulsion {
    Repulsion::new(Vector3::new(1.0e4, 0.0, 0.0), &InteractionParams::default())
  }

  #[test]
  fn displacement_is_pure() {
    let base = Vector3::new(12.0, 0.5, -3.0);
    let phase = Vector4::new(1.0, 2.0, 0.2, 0.7);
    let repulsion = Repulsion::new(Vector3::new(11.0, 0.0, -2.0), &InteractionParams::default());
    let a = displace(base, phase, 37.25, &repulsion);
    let b = displace(base, phase, 37.25, &repulsion);
    assert_eq!(a, b);
  }

  #[test]
  fn orbit_radius_matches_phase() {
    let phase = Vector4::new(0.4, 1.3, 0.25, 0.6);
    for t in [0.0f32, 1.0, 17.5, 1.0e4] {
      let r = orbit(phase, t).magnitude();
      assert!((r - 0.6).abs() < 1e-5, "radius {r} at t={t}");
    }
  }

  #[test]
  fn orbit_at_zero_phase() {
    // theta0 = 0 places the particle at the pole of its orbit sphere
    let offset = orbit(Vector4::new(0.0, 0.0, 0.1, 1.0), 0.0);
    assert!(offset.x.abs() < 1e-6);
    assert!((offset.y - 1.0).abs() < 1e-6);
    assert!(offset.z.abs() < 1e-6);
  }

  #[test]
  fn wrap_angle_stays_in_range() {
    for x in [-100.0f32, -TAU, -0.1, 0.0, 3.0, TAU, 1.0e7, 3.4e9] {
      let w = wrap_angle(x);
      assert!((0.0..TAU).contains(&w), "{x} wrapped to {w}");
    }
    assert!((wrap_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
    assert!((wrap_angle(-1.0) - (TAU - 1.0)).abs() < 1e-5);
  }

  #[test]
  fn long_sessions_stay_finite() {
    let base = Vector3::new(30.0, 0.0, 5.0);
    let phase = Vector4::new(3.0, 6.0, 0.3, 0.9);
    let v = displace(base, phase, 1.0e9, &no_pointer());
    assert!(v.position.x.is_finite() && v.position.y.is_finite() && v.position.z.is_finite());
    assert!((v.position - base).magnitude() <= 0.9 + 1e-4);
  }

  #[test]
  fn repulsion_boundary() {
    let params = InteractionParams::default();
    let position = Vector3::new(0.0, 0.0, 0.0);

    let at_radius = Repulsion::new(Vector3::new(6.0, 0.0, 0.0), &params);
    assert_eq!(at_radius.apply(position), position);

    let outside = Repulsion::new(Vector3::new(0.0, 7.5, 0.0), &params);
    assert_eq!(outside.apply(position), position);

    let inside = Repulsion::new(Vector3::new(5.999, 0.0, 0.0), &params);
    let pushed = inside.apply(position);
    assert!(pushed.x < 0.0, "expected a push along -x, got {pushed:?}");
    assert_eq!(pushed.y, 0.0);
    assert_eq!(pushed.z, 0.0);
  }

  #[test]
  fn repulsion_boundary_through_displace() {
    // zero orbit radius keeps the pre-interaction position at the base
    let base = Vector3::new(0.0, 0.0, 20.0);
    let phase = Vector4::new(1.0, 1.0, 0.1, 0.0);
    let params = InteractionParams::default();
    let far = Repulsion::new(base + Vector3::new(0.0, 6.0, 0.0), &params);
    assert_eq!(displace(base, phase, 3.0, &far).position, base);
    let near = Repulsion::new(base + Vector3::new(0.0, 5.999, 0.0), &params);
    let near = displace(base, phase, 3.0, &near);
    assert_ne!(near.position, base);
  }

  #[test]
  fn repulsion_is_quadratic() {
    let params = InteractionParams::default();
    let repulsion = Repulsion::new(Vector3::new(0.0, 0.0, 0.0), &params);
    // half the radius: (1 - 0.5)^2 * 3 = 0.75
    let pushed = repulsion.apply(Vector3::new(0.0, 0.0, 3.0));
    assert!((pushed.z - 3.75).abs() < 1e-5);
    // almost on top of the target the push approaches the full strength
    let pushed = repulsion.apply(Vector3::new(1.0e-4, 0.0, 0.0));
    assert!((pushed.x - 3.0).abs() < 1e-3);
  }

  #[test]
  fn coincident_point_stays_finite() {
    let repulsion = Repulsion::new(Vector3::new(2.0, 2.0, 2.0), &InteractionParams::default());
    let p = repulsion.apply(Vector3::new(2.0, 2.0, 2.0));
    assert_eq!(p, Vector3::new(2.0, 2.0, 2.0));
  }

  #[test]
  fn color_endpoints() {
    assert_eq!(color_for_distance(0.0), WARM);
    let cool = color_for_distance(1.0);
    assert!((cool - COOL).magnitude() < 1e-6);
    assert_eq!(color_at(Vector3::new(0.0, 0.0, 0.0)), WARM);
    assert!((color_at(Vector3::new(80.0, 0.0, 0.0)) - COOL).magnitude() < 1e-6);
  }

  #[test]
  fn color_blend_is_monotonic() {
    let mut prev = color_for_distance(0.0);
    for step in 1..=1000 {
      let c = color_for_distance(step as f32 / 1000.0);
      assert!(c.x <= prev.x && c.y <= prev.y && c.z >= prev.z, "step {step}");
      // no jumps anywhere along the sweep
      assert!((c - prev).magnitude() < 2e-3, "step {step}");
      prev = c;
    }
  }

  #[test]
  fn color_is_anisotropic() {
    // 10 units up reaches the rim, 10 units out does not
    assert!((color_at(Vector3::new(0.0, 10.0, 0.0)) - COOL).magnitude() < 1e-6);
    assert!(color_at(Vector3::new(10.0, 0.0, 0.0)).x > COOL.x + 0.1);
  }

  #[test]
  fn sprite_is_soft_disc() {
    assert_eq!(sprite_alpha(Vector2::new(0.5, 0.5)), 1.0);
    assert_eq!(sprite_alpha(Vector2::new(0.55, 0.5)), 1.0);
    assert_eq!(sprite_alpha(Vector2::new(1.0, 0.5)), 0.0);
    assert_eq!(sprite_alpha(Vector2::new(0.0, 0.0)), 0.0);
    let mid = sprite_alpha(Vector2::new(0.8, 0.5));
    assert!(mid > 0.0 && mid < 1.0);
    assert!(sprite_alpha(Vector2::new(0.7, 0.5)) > mid);
  }

  #[test]
  fn evaluate_covers_every_particle() {
    let set = crate::initialize::create_galaxy(&crate::FieldParams {
      halo_count: 100,
      disk_count: 200,
      seed: Some(3),
      ..crate::FieldParams::default()
    });
    let vertices = evaluate(&set, 2.0, &no_pointer());
    assert_eq!(vertices.len(), 300);
    assert!(vertices.iter().all(|v| v.color.w == 1.0));
  }
}
