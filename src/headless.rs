use crate::config::Config;
use crate::error::FrameError;
use crate::lifecycle::{FrameHandle, FrameHost, RenderLoop};
use crate::scene::Scene;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fixed frame step of a headless run.
pub const STEP: f32 = 1.0 / 60.0;

const VIEWPORT: (u32, u32) = (1280, 720);

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
  pub frames: u64,
  pub elapsed: f64,
  pub particles: usize,
  pub camera_distance: f32,
  /// Particle positions that were not finite, summed over all frames.
  pub non_finite: u64,
  /// Largest distance of any displaced particle from the field centre.
  pub max_radius: f32,
}

pub struct HeadlessHost {
  scene: Option<Scene>,
  step: f32,
  frames: u64,
  non_finite: u64,
  max_radius: f32,
}

impl HeadlessHost {
  pub fn new(scene: Scene, step: f32) -> Self {
    Self {
      scene: Some(scene),
      step,
      frames: 0,
      non_finite: 0,
      max_radius: 0.0,
    }
  }

  pub fn frames(&self) -> u64 {
    self.frames
  }

  pub fn summary(&self) -> Option<Summary> {
    let scene = self.scene.as_ref()?;
    Some(Summary {
      frames: self.frames,
      elapsed: scene.clock().elapsed(),
      particles: scene.particles().len(),
      camera_distance: scene.camera().distance(),
      non_finite: self.non_finite,
      max_radius: self.max_radius,
    })
  }
}

impl FrameHost for HeadlessHost {
  // Frames are pulled by the driver, nothing to ask for.
  fn request_frame(&mut self, _handle: FrameHandle) {}

  fn cancel_frame(&mut self, _handle: FrameHandle) {}

  fn frame(&mut self) -> Result<(), FrameError> {
    let scene = self.scene.as_mut().ok_or(FrameError::Released)?;
    scene.advance(self.step);
    for vertex in scene.evaluate() {
      let p = vertex.position;
      if p.x.is_finite() && p.y.is_finite() && p.z.is_finite() {
        self.max_radius = self.max_radius.max(cgmath::InnerSpace::magnitude(p));
      } else {
        self.non_finite += 1;
      }
    }
    self.frames += 1;
    Ok(())
  }

  fn release(&mut self) {
    self.scene = None;
  }
}

/// Steps the loop until `frames` frames ran or `stop` is raised. The
/// summary is taken just before the host is released.
pub fn drive(
  render_loop: &mut RenderLoop<HeadlessHost>,
  frames: Option<u64>,
  stop: &AtomicBool,
) -> Option<Summary> {
  render_loop.start();
  loop {
    let done = render_loop
      .host()
      .map_or(true, |host| frames.is_some_and(|limit| host.frames() >= limit));
    if done || stop.load(Ordering::SeqCst) {
      break;
    }
    if !render_loop.on_pending_frame() {
      break;
    }
  }
  let summary = render_loop.host().and_then(HeadlessHost::summary);
  render_loop.dispose();
  summary
}

/// Generates the field and runs it without a window until `frames` frames
/// ran, or until Ctrl-C when no limit is given.
pub fn run(config: Config, frames: Option<u64>) -> Option<Summary> {
  let stop = Arc::new(AtomicBool::new(false));
  let handler_stop = stop.clone();
  if let Err(err) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
    log::warn!("could not install the Ctrl-C handler: {err}");
  }

  let scene = Scene::new(&config, VIEWPORT.0, VIEWPORT.1);
  log::info!(
    "running headless with {} particles, {}",
    scene.particles().len(),
    match frames {
      Some(limit) => format!("{limit} frames"),
      None => "until interrupted".to_string(),
    }
  );
  let mut render_loop = RenderLoop::new(HeadlessHost::new(scene, STEP));
  let summary = drive(&mut render_loop, frames, &stop);
  if let Some(summary) = &summary {
    log::info!(
      "ran {} frames ({:.2}s simulated), camera at {:.2}, max radius {:.2}, {} non-finite",
      summary.frames,
      summary.elapsed,
      summary.camera_distance,
      summary.max_radius,
      summary.non_finite
    );
  }
  summary
}
