use crate::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  Stopped,
  Running,
  Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Visible,
  Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// What the render loop needs from its environment.
pub trait FrameHost {
  /// Ask for one frame callback identified by `handle`.
  fn request_frame(&mut self, handle: FrameHandle);
  /// Withdraw a pending request. Hosts that cannot withdraw may ignore this.
  fn cancel_frame(&mut self, handle: FrameHandle);
  /// Per-frame work. An error skips this frame only.
  fn frame(&mut self) -> Result<(), FrameError>;
  /// Called when the loop stops advancing; time must not accumulate.
  fn suspend(&mut self) {}
  /// Release graphics resources. Called exactly once.
  fn release(&mut self);
}

pub struct RenderLoop<H: FrameHost> {
  state: LoopState,
  host: Option<H>,
  pending: Option<FrameHandle>,
  next_handle: u64,
  skipped_frames: u64,
}

impl<H: FrameHost> RenderLoop<H> {
  pub fn new(host: H) -> Self {
    Self {
      state: LoopState::Stopped,
      host: Some(host),
      pending: None,
      next_handle: 0,
      skipped_frames: 0,
    }
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn host(&self) -> Option<&H> {
    self.host.as_ref()
  }

  pub fn host_mut(&mut self) -> Option<&mut H> {
    self.host.as_mut()
  }

  pub fn pending(&self) -> Option<FrameHandle> {
    self.pending
  }

  pub fn is_disposed(&self) -> bool {
    self.host.is_none()
  }

  /// Frames whose work failed and was skipped.
  pub fn skipped_frames(&self) -> u64 {
    self.skipped_frames
  }

  fn schedule(&mut self) {
    let Some(host) = self.host.as_mut() else {
      return;
    };
    let handle = FrameHandle(self.next_handle);
    self.next_handle += 1;
    self.pending = Some(handle);
    host.request_frame(handle);
  }

  fn cancel_pending(&mut self) {
    if let (Some(handle), Some(host)) = (self.pending.take(), self.host.as_mut()) {
      host.cancel_frame(handle);
    }
  }

  /// `Stopped -> Running`. Returns false when nothing changed.
  pub fn start(&mut self) -> bool {
    if self.state != LoopState::Stopped || self.host.is_none() {
      log::debug!("start ignored in {:?}", self.state);
      return false;
    }
    self.state = LoopState::Running;
    log::info!("render loop started");
    self.schedule();
    true
  }

  /// `Running -> Paused`.
  pub fn pause(&mut self) -> bool {
    if self.state != LoopState::Running {
      log::debug!("pause ignored in {:?}", self.state);
      return false;
    }
    self.cancel_pending();
    if let Some(host) = self.host.as_mut() {
      host.suspend();
    }
    self.state = LoopState::Paused;
    log::debug!("render loop paused");
    true
  }

  /// `Paused -> Running`.
  pub fn resume(&mut self) -> bool {
    if self.state != LoopState::Paused {
      log::debug!("resume ignored in {:?}", self.state);
      return false;
    }
    self.state = LoopState::Running;
    log::debug!("render loop resumed");
    self.schedule();
    true
  }

  /// `Running | Paused -> Stopped`, releasing the host. Terminal: a disposed
  /// loop cannot be started again.
  pub fn dispose(&mut self) -> bool {
    if self.host.is_none() {
      return false;
    }
    self.cancel_pending();
    if let Some(mut host) = self.host.take() {
      host.release();
    }
    self.state = LoopState::Stopped;
    log::info!("render loop disposed");
    true
  }

  /// Frame callback for `handle`. Stale or cancelled handles are ignored.
  /// Returns true when frame work ran.
  pub fn on_frame(&mut self, handle: FrameHandle) -> bool {
    if self.state != LoopState::Running || self.pending != Some(handle) {
      log::trace!("dropping stale frame {handle:?}");
      return false;
    }
    self.pending = None;
    let Some(host) = self.host.as_mut() else {
      return false;
    };
    if let Err(err) = host.frame() {
      self.skipped_frames += 1;
      match err {
        FrameError::Surface(wgpu::SurfaceError::OutOfMemory) => {
          log::error!("frame skipped: {err}")
        }
        _ => log::warn!("frame skipped: {err}"),
      }
    }
    self.schedule();
    true
  }

  /// Frame callback for hosts whose callbacks carry no handle: runs the
  /// currently pending frame, if any.
  pub fn on_pending_frame(&mut self) -> bool {
    match self.pending {
      Some(handle) => self.on_frame(handle),
      None => false,
    }
  }
}

/// When the loop is first started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
  Immediate,
  FirstInteraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
  /// Click, key press or touch.
  Interaction,
  Visibility(Visibility),
  Teardown,
}

/// Maps host signals onto render loop transitions.
pub struct LifecycleController<H: FrameHost> {
  render_loop: RenderLoop<H>,
  trigger: StartTrigger,
}

impl<H: FrameHost> LifecycleController<H> {
  pub fn new(host: H, trigger: StartTrigger) -> Self {
    Self {
      render_loop: RenderLoop::new(host),
      trigger,
    }
  }

  /// Starts right away unless the start waits for an interaction.
  pub fn init(&mut self) {
    if self.trigger == StartTrigger::Immediate {
      self.render_loop.start();
    }
  }

  pub fn render_loop(&self) -> &RenderLoop<H> {
    &self.render_loop
  }

  pub fn render_loop_mut(&mut self) -> &mut RenderLoop<H> {
    &mut self.render_loop
  }

  pub fn state(&self) -> LoopState {
    self.render_loop.state()
  }

  pub fn handle(&mut self, signal: HostSignal) {
    match signal {
      HostSignal::Interaction => {
        if self.trigger == StartTrigger::FirstInteraction && self.state() == LoopState::Stopped {
          self.render_loop.start();
        }
      }
      HostSignal::Visibility(Visibility::Hidden) => {
        self.render_loop.pause();
      }
      HostSignal::Visibility(Visibility::Visible) => {
        self.render_loop.resume();
      }
      HostSignal::Teardown => {
        self.render_loop.dispose();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct RecordingHost {
    requested: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
    frames: usize,
    suspended: usize,
    fail_next: bool,
    released: std::rc::Rc<std::cell::Cell<usize>>,
  }

  impl FrameHost for RecordingHost {
    fn request_frame(&mut self, handle: FrameHandle) {
      self.requested.push(handle);
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
      self.cancelled.push(handle);
    }

    fn frame(&mut self) -> Result<(), FrameError> {
      if std::mem::take(&mut self.fail_next) {
        return Err(FrameError::Surface(wgpu::SurfaceError::Lost));
      }
      self.frames += 1;
      Ok(())
    }

    fn suspend(&mut self) {
      self.suspended += 1;
    }

    fn release(&mut self) {
      self.released.set(self.released.get() + 1);
    }
  }

  fn host(lp: &RenderLoop<RecordingHost>) -> &RecordingHost {
    lp.host().unwrap()
  }

  #[test]
  fn start_schedules_one_frame() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    assert_eq!(lp.state(), LoopState::Stopped);
    assert!(lp.start());
    assert_eq!(lp.state(), LoopState::Running);
    assert_eq!(host(&lp).requested.len(), 1);
    assert!(!lp.start());
    assert_eq!(host(&lp).requested.len(), 1);
  }

  #[test]
  fn frames_reschedule_themselves() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    lp.start();
    for _ in 0..5 {
      assert!(lp.on_pending_frame());
    }
    assert_eq!(host(&lp).frames, 5);
    assert_eq!(host(&lp).requested.len(), 6);
  }

  #[test]
  fn double_pause_cancels_once() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    lp.start();
    assert!(lp.pause());
    assert!(!lp.pause());
    assert_eq!(lp.state(), LoopState::Paused);
    assert_eq!(host(&lp).cancelled.len(), 1);
    assert_eq!(host(&lp).suspended, 1);
    assert_eq!(lp.pending(), None);
  }

  #[test]
  fn resume_before_start_is_noop() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    assert!(!lp.resume());
    assert_eq!(lp.state(), LoopState::Stopped);
    assert!(host(&lp).requested.is_empty());
  }

  #[test]
  fn pause_then_resume() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    lp.start();
    lp.pause();
    assert!(lp.resume());
    assert_eq!(lp.state(), LoopState::Running);
    assert_eq!(host(&lp).requested.len(), 2);
    assert!(lp.on_pending_frame());
  }

  #[test]
  fn cancelled_callback_is_dropped() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    lp.start();
    let stale = lp.pending().unwrap();
    lp.pause();
    // the host delivered the callback anyway
    assert!(!lp.on_frame(stale));
    lp.resume();
    assert!(!lp.on_frame(stale));
    assert_eq!(host(&lp).frames, 0);
    let fresh = lp.pending().unwrap();
    assert!(lp.on_frame(fresh));
    assert_eq!(host(&lp).frames, 1);
  }

  #[test]
  fn failed_frame_keeps_loop_alive() {
    let mut lp = RenderLoop::new(RecordingHost {
      fail_next: true,
      ..RecordingHost::default()
    });
    lp.start();
    assert!(lp.on_pending_frame());
    assert_eq!(lp.skipped_frames(), 1);
    assert_eq!(lp.state(), LoopState::Running);
    assert!(lp.on_pending_frame());
    assert_eq!(host(&lp).frames, 1);
  }

  #[test]
  fn dispose_is_terminal_and_idempotent() {
    let released = std::rc::Rc::new(std::cell::Cell::new(0));
    let mut lp = RenderLoop::new(RecordingHost {
      released: released.clone(),
      ..RecordingHost::default()
    });
    lp.start();
    let pending = lp.pending().unwrap();
    assert!(lp.dispose());
    assert!(!lp.dispose());
    assert_eq!(released.get(), 1);
    assert_eq!(lp.state(), LoopState::Stopped);
    assert!(lp.is_disposed());
    assert!(!lp.on_frame(pending));
    assert!(!lp.start());
    assert!(!lp.resume());
    assert!(!lp.pause());
  }

  #[test]
  fn dispose_from_paused() {
    let mut lp = RenderLoop::new(RecordingHost::default());
    lp.start();
    lp.pause();
    assert!(lp.dispose());
    assert_eq!(lp.state(), LoopState::Stopped);
  }

  #[test]
  fn controller_waits_for_interaction() {
    let mut controller =
      LifecycleController::new(RecordingHost::default(), StartTrigger::FirstInteraction);
    controller.init();
    assert_eq!(controller.state(), LoopState::Stopped);
    controller.handle(HostSignal::Visibility(Visibility::Visible));
    assert_eq!(controller.state(), LoopState::Stopped);
    controller.handle(HostSignal::Interaction);
    assert_eq!(controller.state(), LoopState::Running);
    controller.handle(HostSignal::Interaction);
    assert_eq!(controller.render_loop().host().unwrap().requested.len(), 1);
  }

  #[test]
  fn controller_maps_visibility_and_teardown() {
    let mut controller =
      LifecycleController::new(RecordingHost::default(), StartTrigger::Immediate);
    controller.init();
    assert_eq!(controller.state(), LoopState::Running);
    controller.handle(HostSignal::Visibility(Visibility::Hidden));
    assert_eq!(controller.state(), LoopState::Paused);
    controller.handle(HostSignal::Visibility(Visibility::Hidden));
    assert_eq!(controller.render_loop().host().unwrap().cancelled.len(), 1);
    controller.handle(HostSignal::Visibility(Visibility::Visible));
    assert_eq!(controller.state(), LoopState::Running);
    controller.handle(HostSignal::Teardown);
    controller.handle(HostSignal::Teardown);
    assert!(controller.render_loop().is_disposed());
    controller.handle(HostSignal::Interaction);
    controller.handle(HostSignal::Visibility(Visibility::Visible));
    assert_eq!(controller.state(), LoopState::Stopped);
  }
}
