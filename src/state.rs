use crate::camera::{Camera, CameraUniform};
use crate::config::Config;
use crate::error::{FrameError, GalaxyError};
use crate::lifecycle::{
  FrameHandle, FrameHost, HostSignal, LifecycleController, StartTrigger, Visibility,
};
use crate::render::Render;
use crate::scene::Scene;
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use winit::event::{ElementState, Touch, TouchPhase};
use winit::keyboard::*;
use winit::{
  dpi::{LogicalSize, PhysicalSize},
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{EventLoop, EventLoopWindowTarget},
  window::Window,
};

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  pub fn new(title: &str) -> Result<Self, GalaxyError> {
    let event_loop = EventLoop::new()?;
    let builder = winit::window::WindowBuilder::new()
      .with_title(title)
      .with_inner_size(LogicalSize::new(1280.0, 720.0));
    let window = Arc::new(builder.build(&event_loop)?);

    Ok(Self { event_loop, window })
  }
}

struct SurfaceWrapper {
  surface: wgpu::Surface<'static>,
  config: wgpu::SurfaceConfiguration,
}

impl SurfaceWrapper {
  fn configure(
    surface: wgpu::Surface<'static>,
    context: &State,
    size: PhysicalSize<u32>,
  ) -> Result<Self, GalaxyError> {
    let width = size.width.max(1);
    let height = size.height.max(1);
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .ok_or_else(|| GalaxyError::initialization("surface is not supported by the adapter"))?;
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    Ok(Self { surface, config })
  }

  fn resize(&mut self, context: &State, size: PhysicalSize<u32>) {
    if size.width == 0 || size.height == 0 {
      return;
    }
    self.config.width = size.width;
    self.config.height = size.height;
    self.surface.configure(&context.device, &self.config);
  }

  fn acquire(&mut self, context: &State) -> Result<wgpu::SurfaceTexture, FrameError> {
    match self.surface.get_current_texture() {
      Ok(frame) => Ok(frame),
      Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
        // one retry on a freshly configured surface, then give up on this frame
        self.surface.configure(&context.device, &self.config);
        self.surface.get_current_texture().map_err(FrameError::from)
      }
      Err(err) => Err(err.into()),
    }
  }

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    &self.config
  }
}

struct State {
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  camera_uniform: CameraUniform,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  camera_bind_group_layout: wgpu::BindGroupLayout,
}

impl State {
  fn update(&mut self, camera: &Camera) {
    self.camera_uniform.update_view_proj(camera);
    self.queue.write_buffer(
      &self.camera_buffer,
      0,
      bytemuck::cast_slice(&[self.camera_uniform]),
    );
  }

  async fn init(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>), GalaxyError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });
    let surface = instance.create_surface(window)?;

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
      })
      .await
      .ok_or_else(|| GalaxyError::initialization("no compatible graphics adapter"))?;
    log::info!("using adapter {}", adapter.get_info().name);

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await?;

    let camera_uniform = CameraUniform::new();
    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[camera_uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("camera_bind_group_layout"),
      });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });

    let state = Self {
      adapter,
      device,
      queue,
      camera_uniform,
      camera_buffer,
      camera_bind_group,
      camera_bind_group_layout,
    };
    Ok((state, surface))
  }

  fn release(&self) {
    self.camera_buffer.destroy();
  }
}

/// Window-backed frame host. Graphics resources and the scene live in
/// `Option`s so that releasing them leaves nothing behind.
struct GalaxyHost {
  window: Arc<Window>,
  context: State,
  surface: Option<SurfaceWrapper>,
  render: Option<Render>,
  scene: Option<Scene>,
}

impl GalaxyHost {
  fn input(&mut self, event: &WindowEvent) -> bool {
    match self.scene.as_mut() {
      Some(scene) => scene.input(event),
      None => false,
    }
  }

  fn resize(&mut self, size: PhysicalSize<u32>) {
    if let Some(surface) = self.surface.as_mut() {
      surface.resize(&self.context, size);
    }
    if let Some(scene) = self.scene.as_mut() {
      scene.resize(size.width, size.height);
    }
    log::debug!("resized to {}x{}", size.width, size.height);
  }
}

impl FrameHost for GalaxyHost {
  fn request_frame(&mut self, _handle: FrameHandle) {
    self.window.request_redraw();
  }

  // A redraw request cannot be withdrawn; the render loop drops it instead.
  fn cancel_frame(&mut self, _handle: FrameHandle) {}

  fn frame(&mut self) -> Result<(), FrameError> {
    let (Some(scene), Some(render), Some(surface)) =
      (self.scene.as_mut(), self.render.as_ref(), self.surface.as_mut())
    else {
      return Err(FrameError::Released);
    };
    // no scene step for a frame that cannot be presented
    let frame = surface.acquire(&self.context)?;
    scene.tick(Instant::now());
    self.context.update(scene.camera());
    render.update(&self.context.queue, &scene.field_uniform());

    let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
      format: Some(surface.config().view_formats[0]),
      ..wgpu::TextureViewDescriptor::default()
    });
    render.render(
      &view,
      &self.context.device,
      &self.context.queue,
      &self.context.camera_bind_group,
    );
    frame.present();
    Ok(())
  }

  fn suspend(&mut self) {
    if let Some(scene) = self.scene.as_mut() {
      scene.pause();
    }
  }

  fn release(&mut self) {
    if let Some(render) = self.render.take() {
      render.release();
    }
    self.scene = None;
    self.surface = None;
    self.context.release();
  }
}

fn is_interaction(event: &WindowEvent) -> bool {
  matches!(
    event,
    WindowEvent::MouseInput {
      state: ElementState::Pressed,
      ..
    } | WindowEvent::KeyboardInput {
      event: KeyEvent {
        state: ElementState::Pressed,
        ..
      },
      ..
    } | WindowEvent::Touch(Touch {
      phase: TouchPhase::Started,
      ..
    }) | WindowEvent::MouseWheel { .. }
  )
}

fn window_event(
  lifecycle: &mut LifecycleController<GalaxyHost>,
  event: WindowEvent,
  target: &EventLoopWindowTarget<()>,
) {
  if is_interaction(&event) {
    lifecycle.handle(HostSignal::Interaction);
  }
  let consumed = lifecycle
    .render_loop_mut()
    .host_mut()
    .is_some_and(|host| host.input(&event));
  if consumed {
    return;
  }
  match event {
    WindowEvent::CloseRequested
    | WindowEvent::KeyboardInput {
      event:
        KeyEvent {
          state: ElementState::Pressed,
          physical_key: PhysicalKey::Code(KeyCode::Escape),
          ..
        },
      ..
    } => {
      lifecycle.handle(HostSignal::Teardown);
      target.exit();
    }
    WindowEvent::Resized(size) => {
      if let Some(host) = lifecycle.render_loop_mut().host_mut() {
        host.resize(size);
      }
    }
    WindowEvent::Occluded(occluded) => {
      let visibility = if occluded {
        Visibility::Hidden
      } else {
        Visibility::Visible
      };
      lifecycle.handle(HostSignal::Visibility(visibility));
    }
    WindowEvent::RedrawRequested => {
      lifecycle.render_loop_mut().on_pending_frame();
    }
    _ => {}
  }
}

async fn start(config: Config, trigger: StartTrigger) -> Result<(), GalaxyError> {
  let window_loop = EventLoopWrapper::new("Galaxy Field")?;
  let size = window_loop.window.inner_size();
  let (context, surface) = State::init(window_loop.window.clone()).await?;
  let surface = SurfaceWrapper::configure(surface, &context, size)?;

  let scene = Scene::new(&config, size.width, size.height);
  let render = Render::init(
    surface.config(),
    &context.device,
    &context.camera_bind_group_layout,
    &scene.particles().instances(),
    &config.render,
  );
  let host = GalaxyHost {
    window: window_loop.window.clone(),
    context,
    surface: Some(surface),
    render: Some(render),
    scene: Some(scene),
  };
  let mut lifecycle = LifecycleController::new(host, trigger);
  let window = window_loop.window;

  window_loop.event_loop.run(
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => lifecycle.init(),
      Event::Suspended => lifecycle.handle(HostSignal::Visibility(Visibility::Hidden)),
      Event::Resumed => lifecycle.handle(HostSignal::Visibility(Visibility::Visible)),
      Event::LoopExiting => lifecycle.handle(HostSignal::Teardown),
      Event::WindowEvent { event, window_id } if window_id == window.id() => {
        window_event(&mut lifecycle, event, target);
      }
      _ => {}
    },
  )?;
  Ok(())
}

/// Opens a window and runs the field until it is closed. Fails without
/// starting when no graphics device is available.
pub fn run(config: Config, trigger: StartTrigger) -> Result<(), GalaxyError> {
  pollster::block_on(start(config, trigger))
}
