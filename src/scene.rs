use crate::camera::{Camera, FlyIn, OrbitController};
use crate::clock::Clock;
use crate::config::Config;
use crate::field::{self, Repulsion, Vertex};
use crate::initialize::{create_galaxy, ParticleSet};
use crate::pointer::PointerProjector;
use crate::{FieldUniform, InteractionParams, RenderParams};
use cgmath::{Matrix, Matrix3, Matrix4, Rad};
use std::time::Instant;
use winit::event::{TouchPhase, WindowEvent};

/// Rotation of the particle field: a fixed tilt about Z over a spin about Y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldOrientation {
  pub tilt: f32,
  pub spin: f32,
}

impl FieldOrientation {
  pub fn rotation(&self) -> Matrix3<f32> {
    Matrix3::from_angle_z(Rad(self.tilt)) * Matrix3::from_angle_y(Rad(self.spin))
  }

  pub fn model(&self) -> Matrix4<f32> {
    Matrix4::from(self.rotation())
  }

  /// Inverse of [`FieldOrientation::rotation`].
  pub fn world_to_local(&self) -> Matrix3<f32> {
    self.rotation().transpose()
  }

  pub fn spin_by(&mut self, angle: f32) {
    self.spin = field::wrap_angle(self.spin + angle);
  }
}

pub struct Scene {
  particles: ParticleSet,
  clock: Clock,
  camera: Camera,
  orbit: OrbitController,
  fly_in: FlyIn,
  fly_in_active: bool,
  rotation_speed: f32,
  orientation: FieldOrientation,
  pointer: PointerProjector,
  interaction: InteractionParams,
  render: RenderParams,
  viewport: (u32, u32),
}

impl Scene {
  pub fn new(config: &Config, width: u32, height: u32) -> Self {
    Self::with_particles(create_galaxy(&config.field), config, width, height)
  }

  pub fn with_particles(particles: ParticleSet, config: &Config, width: u32, height: u32) -> Self {
    let fly_in = FlyIn::new(&config.fly_in);
    let width = width.max(1);
    let height = height.max(1);
    let camera = Camera::new(
      fly_in.initial_eye(),
      width as f32 / height as f32,
      &config.camera,
    );
    let mut orbit = OrbitController::init(&config.camera);
    orbit.set_viewport_height(height);
    Self {
      particles,
      clock: Clock::new(),
      camera,
      orbit,
      fly_in_active: fly_in.is_enabled(),
      rotation_speed: fly_in.sample(0.0).rotation_speed,
      fly_in,
      orientation: FieldOrientation {
        tilt: config.render.tilt,
        spin: 0.0,
      },
      pointer: PointerProjector::new(&config.interaction),
      interaction: config.interaction,
      render: config.render,
      viewport: (width, height),
    }
  }

  pub fn particles(&self) -> &ParticleSet {
    &self.particles
  }

  pub fn camera(&self) -> &Camera {
    &self.camera
  }

  pub fn clock(&self) -> &Clock {
    &self.clock
  }

  pub fn pointer(&self) -> &PointerProjector {
    &self.pointer
  }

  pub fn pointer_mut(&mut self) -> &mut PointerProjector {
    &mut self.pointer
  }

  pub fn orientation(&self) -> FieldOrientation {
    self.orientation
  }

  pub fn rotation_speed(&self) -> f32 {
    self.rotation_speed
  }

  pub fn viewport(&self) -> (u32, u32) {
    self.viewport
  }

  pub fn resize(&mut self, width: u32, height: u32) {
    if width == 0 || height == 0 {
      return;
    }
    self.viewport = (width, height);
    self.camera.set_viewport(width, height);
    self.orbit.set_viewport_height(height);
  }

  /// Feeds orbit controls and the pointer. Returns true when the event was
  /// fully consumed by the camera.
  pub fn input(&mut self, event: &WindowEvent) -> bool {
    let consumed = self.orbit.process_events(event);
    let (width, height) = self.viewport;
    match event {
      WindowEvent::CursorMoved { position, .. } => {
        self.pointer.set_screen_position(position.x, position.y, width, height);
      }
      WindowEvent::Touch(touch)
        if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) =>
      {
        self
          .pointer
          .set_screen_position(touch.location.x, touch.location.y, width, height);
      }
      _ => {}
    }
    consumed
  }

  /// Stops the clock from counting the time until the next tick.
  pub fn pause(&mut self) {
    self.clock.pause();
  }

  /// Wall-clock frame step.
  pub fn tick(&mut self, now: Instant) -> f32 {
    let delta = self.clock.tick(now);
    self.step(delta);
    delta
  }

  /// Fixed frame step, used headless and in tests.
  pub fn advance(&mut self, delta: f32) {
    let delta = self.clock.advance(delta);
    self.step(delta);
  }

  fn step(&mut self, delta: f32) {
    let elapsed = self.clock.elapsed() as f32;
    if self.fly_in_active {
      let sample = self.fly_in.apply(&mut self.camera, elapsed);
      self.rotation_speed = sample.rotation_speed;
      if self.fly_in.is_finished(elapsed) {
        self.fly_in_active = false;
        log::debug!("fly-in finished at {elapsed:.2}s");
      }
    }
    self.orbit.update_camera(&mut self.camera);
    self.orientation.spin_by(self.rotation_speed * delta);
    let world_to_local = self.orientation.world_to_local();
    if !self.pointer.update(&self.camera, &world_to_local) {
      log::trace!("pointer ray missed the interaction plane");
    }
  }

  /// Global time fed to the displacement function.
  pub fn shader_time(&self) -> f32 {
    (self.clock.elapsed() * f64::from(self.render.time_scale)) as f32
  }

  pub fn repulsion(&self) -> Repulsion {
    Repulsion::new(self.pointer.target(), &self.interaction)
  }

  pub fn field_uniform(&self) -> FieldUniform {
    FieldUniform {
      model: self.orientation.model().into(),
      pointer: self.pointer.target().into(),
      time: self.shader_time(),
      aspect: self.camera.aspect,
      point_size: self.render.point_size,
      interaction_radius: self.interaction.radius,
      interaction_strength: self.interaction.strength,
    }
  }

  /// CPU evaluation of every particle in the field's local space.
  pub fn evaluate(&self) -> Vec<Vertex> {
    field::evaluate(&self.particles, self.shader_time(), &self.repulsion())
  }
}
