use crate::{FieldParams, Particle};
use cgmath::{InnerSpace, Vector3, Vector4};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use std::f32::consts::PI;
use std::ops::Range;

/// Static per-particle attributes. The three arrays are parallel and are
/// never mutated after generation.
#[derive(Clone, Debug)]
pub struct ParticleSet {
  positions: Vec<Vector3<f32>>,
  sizes: Vec<f32>,
  phases: Vec<Vector4<f32>>,
  halo_count: usize,
}

impl ParticleSet {
  fn with_capacity(capacity: usize) -> Self {
    Self {
      positions: Vec::with_capacity(capacity),
      sizes: Vec::with_capacity(capacity),
      phases: Vec::with_capacity(capacity),
      halo_count: 0,
    }
  }

  fn push(&mut self, pos: Vector3<f32>, size: f32, phase: Vector4<f32>) {
    self.positions.push(pos);
    self.sizes.push(size);
    self.phases.push(phase);
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn positions(&self) -> &[Vector3<f32>] {
    &self.positions
  }

  pub fn sizes(&self) -> &[f32] {
    &self.sizes
  }

  pub fn phases(&self) -> &[Vector4<f32>] {
    &self.phases
  }

  /// Indices of the spherical shell particles.
  pub fn halo(&self) -> Range<usize> {
    0..self.halo_count
  }

  /// Indices of the disk particles.
  pub fn disk(&self) -> Range<usize> {
    self.halo_count..self.len()
  }

  pub fn particle(&self, i: usize) -> Particle {
    let pos = self.positions[i];
    let phase = self.phases[i];
    Particle {
      pos: pos.into(),
      size: self.sizes[i],
      phase: phase.into(),
    }
  }

  /// Interleaved instance data for upload.
  pub fn instances(&self) -> Vec<Particle> {
    (0..self.len()).map(|i| self.particle(i)).collect()
  }
}

/// Generates halo then disk particles in one pass.
#[must_use]
pub fn create_galaxy(params: &FieldParams) -> ParticleSet {
  let mut rng = match params.seed {
    Some(seed) => SmallRng::seed_from_u64(seed),
    None => SmallRng::from_entropy(),
  };
  let mut set = ParticleSet::with_capacity(params.particle_count());
  halo(&mut rng, &mut set, params);
  set.halo_count = set.len();
  disk(&mut rng, &mut set, params);
  log::info!(
    "generated {} particles ({} halo, {} disk)",
    set.len(),
    set.halo_count,
    set.len() - set.halo_count
  );
  set
}

fn halo(rng: &mut SmallRng, set: &mut ParticleSet, params: &FieldParams) {
  let unit = Uniform::new(0.0f32, 1.0);
  let (inner, outer) = ordered(params.halo_inner_radius, params.halo_outer_radius);
  let radius = span(inner, outer);
  for _ in 0..params.halo_count {
    // inverse-CDF sampling keeps directions uniform on the sphere
    let theta = 2.0 * PI * unit.sample(rng);
    let phi = (2.0 * unit.sample(rng) - 1.0).clamp(-1.0, 1.0).acos();
    let dir = Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
    let pos = loop {
      let pos = dir * radius.sample(rng);
      // rounding in the direction can leave the length a hair outside the shell
      if inner >= outer || (inner..outer).contains(&pos.magnitude()) {
        break pos;
      }
    };
    let size = particle_size(rng);
    let phase = particle_phase(rng);
    set.push(pos, size, phase);
  }
}

fn disk(rng: &mut SmallRng, set: &mut ParticleSet, params: &FieldParams) {
  let (r_min, r_max) = ordered(params.disk_inner_radius, params.disk_outer_radius);
  let angle = Uniform::new(0.0f32, 2.0 * PI);
  let half_height = params.disk_half_height.abs();
  let height = span(-half_height, half_height);
  for _ in 0..params.disk_count {
    // blend of squared radii, weighted towards the outer edge
    let blend = rng.gen::<f32>().powf(params.radial_exponent);
    let radius = (r_max * r_max * blend + r_min * r_min * (1.0 - blend))
      .sqrt()
      .clamp(r_min, r_max);
    let alpha = angle.sample(rng);
    let pos = Vector3::new(radius * alpha.sin(), height.sample(rng), radius * alpha.cos());
    let size = particle_size(rng);
    let phase = particle_phase(rng);
    set.push(pos, size, phase);
  }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
  (a.min(b), a.max(b))
}

/// `[a, b)`, or the single value when the bounds meet.
fn span(a: f32, b: f32) -> Uniform<f32> {
  let (low, high) = ordered(a, b);
  if low < high {
    Uniform::new(low, high)
  } else {
    Uniform::new_inclusive(low, high)
  }
}

fn particle_size(rng: &mut SmallRng) -> f32 {
  rng.gen::<f32>() * 1.5 + 0.5
}

fn particle_phase(rng: &mut SmallRng) -> Vector4<f32> {
  Vector4::new(
    rng.gen::<f32>() * PI,
    rng.gen::<f32>() * PI * 2.0,
    (rng.gen::<f32>() * 0.9 + 0.1) * PI * 0.1,
    rng.gen::<f32>() * 0.9 + 0.1,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn seeded() -> ParticleSet {
    create_galaxy(&FieldParams {
      seed: Some(42),
      ..FieldParams::default()
    })
  }

  #[test]
  fn counts_are_parallel() {
    let set = seeded();
    assert_eq!(set.len(), 150_000);
    assert_eq!(set.sizes().len(), set.len());
    assert_eq!(set.phases().len(), set.len());
    assert_eq!(set.halo().len(), 50_000);
    assert_eq!(set.disk().len(), 100_000);
  }

  #[test]
  fn halo_lies_in_shell() {
    let set = seeded();
    for i in set.halo() {
      let r = set.positions()[i].magnitude();
      assert!((9.5..10.0).contains(&r), "halo radius {r}");
    }
  }

  #[test]
  fn halo_shell_is_half_open_for_any_seed() {
    for seed in 1..=5 {
      let set = create_galaxy(&FieldParams {
        disk_count: 0,
        seed: Some(seed),
        ..FieldParams::default()
      });
      for p in set.positions() {
        let r = p.magnitude();
        assert!((9.5..10.0).contains(&r), "seed {seed}: halo radius {r}");
      }
    }
  }

  #[test]
  fn disk_lies_in_annulus() {
    let set = seeded();
    for i in set.disk() {
      let p = set.positions()[i];
      let radial = (p.x * p.x + p.z * p.z).sqrt();
      assert!((10.0 - 1e-3..=40.0 + 1e-3).contains(&radial), "disk radius {radial}");
      assert!((-1.0..=1.0).contains(&p.y), "disk height {}", p.y);
    }
  }

  #[test]
  fn disk_is_biased_outwards() {
    let set = seeded();
    let disk = set.disk();
    let outer = disk
      .clone()
      .filter(|&i| {
        let p = set.positions()[i];
        (p.x * p.x + p.z * p.z).sqrt() > 25.0
      })
      .count();
    assert!(outer * 2 > disk.len(), "only {outer} of {} beyond the midpoint", disk.len());
  }

  #[test]
  fn sizes_and_phases_in_range() {
    let set = seeded();
    for (size, phase) in set.sizes().iter().zip(set.phases()) {
      assert!((0.5..2.0).contains(size));
      assert!((0.0..PI).contains(&phase.x));
      assert!((0.0..2.0 * PI).contains(&phase.y));
      assert!(phase.z >= 0.1 * PI * 0.1 - 1e-6 && phase.z < PI * 0.1);
      assert!((0.1..1.0).contains(&phase.w));
    }
  }

  #[test]
  fn same_seed_same_field() {
    let a = seeded();
    let b = seeded();
    assert_eq!(a.particle(1234), b.particle(1234));
    assert_eq!(a.particle(123_456), b.particle(123_456));
  }

  #[test]
  fn instances_interleave_attributes() {
    let set = create_galaxy(&FieldParams {
      halo_count: 3,
      disk_count: 4,
      seed: Some(1),
      ..FieldParams::default()
    });
    let instances = set.instances();
    assert_eq!(instances.len(), 7);
    let pos: [f32; 3] = set.positions()[5].into();
    let phase: [f32; 4] = set.phases()[5].into();
    assert_eq!(instances[5].pos, pos);
    assert_eq!(instances[5].size, set.sizes()[5]);
    assert_eq!(instances[5].phase, phase);
  }
}
