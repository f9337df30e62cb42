use std::time::Instant;

/// Elapsed and per-frame time. Elapsed time only grows while the clock is
/// running; time spent paused is never counted.
#[derive(Clone, Debug, Default)]
pub struct Clock {
  elapsed: f64,
  last: Option<Instant>,
}

impl Clock {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn elapsed(&self) -> f64 {
    self.elapsed
  }

  /// Samples `now` and returns the time since the previous tick. The first
  /// tick after construction or [`Clock::pause`] returns zero.
  pub fn tick(&mut self, now: Instant) -> f32 {
    let delta = match self.last {
      Some(last) => now.saturating_duration_since(last).as_secs_f32(),
      None => 0.0,
    };
    self.last = Some(now);
    self.advance(delta)
  }

  /// Moves the clock forward by a fixed step.
  pub fn advance(&mut self, delta: f32) -> f32 {
    let delta = delta.max(0.0);
    self.elapsed += f64::from(delta);
    delta
  }

  /// Forgets the last sample so the gap until the next tick is not counted.
  pub fn pause(&mut self) {
    self.last = None;
  }
}
