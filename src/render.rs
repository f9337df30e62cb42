use crate::{FieldUniform, Particle, RenderParams};
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

const DRAW_SHADER: &str = include_str!("shaders/draw.wgsl");

/// Two triangles covering a unit sprite centred on its particle.
const SPRITE_CORNERS: [[f32; 2]; 6] = [
  [-0.5, -0.5],
  [0.5, -0.5],
  [0.5, 0.5],
  [-0.5, -0.5],
  [0.5, 0.5],
  [-0.5, 0.5],
];

/// Additive: the sprite's colour weighted by its alpha is added on top of
/// whatever is already there.
const ADDITIVE: wgpu::BlendComponent = wgpu::BlendComponent {
  src_factor: wgpu::BlendFactor::SrcAlpha,
  dst_factor: wgpu::BlendFactor::One,
  operation: wgpu::BlendOperation::Add,
};

pub fn srgb_to_linear(channel: u8) -> f64 {
  let c = f64::from(channel) / 255.0;
  if c <= 0.04045 {
    c / 12.92
  } else {
    ((c + 0.055) / 1.055).powf(2.4)
  }
}

pub fn clear_color(background: [u8; 3]) -> wgpu::Color {
  wgpu::Color {
    r: srgb_to_linear(background[0]),
    g: srgb_to_linear(background[1]),
    b: srgb_to_linear(background[2]),
    a: 1.0,
  }
}

pub struct Render {
  field_buffer: wgpu::Buffer,
  field_bind_group: wgpu::BindGroup,
  particle_buffer: wgpu::Buffer,
  corners_buffer: wgpu::Buffer,
  render_pipeline: wgpu::RenderPipeline,
  num_particles: u32,
  clear_color: wgpu::Color,
}

impl Render {
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    particles: &[Particle],
    params: &RenderParams,
  ) -> Self {
    let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("draw"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(DRAW_SHADER)),
    });

    let field_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Field Uniform Buffer"),
      contents: bytemuck::cast_slice(&[FieldUniform::zeroed_with(params)]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let field_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FieldUniform>() as _),
          },
          count: None,
        }],
        label: Some("field_bind_group_layout"),
      });
    let field_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &field_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: field_buffer.as_entire_binding(),
      }],
      label: Some("field_bind_group"),
    });

    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("render"),
      bind_group_layouts: &[camera_bind_group_layout, &field_bind_group_layout],
      push_constant_ranges: &[],
    });
    let particle_layout = wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Particle>() as wgpu::BufferAddress, // pos3 + size + phase4
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4],
    };
    let corner_layout = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![3 => Float32x2],
    };
    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Render Pipeline"),
      layout: Some(&render_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &draw_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[particle_layout, corner_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &draw_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(wgpu::BlendState {
            color: ADDITIVE,
            alpha: ADDITIVE,
          }),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState::default(),
      // sprites are never occluded
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let corners_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Sprite Corner Buffer"),
      contents: bytemuck::cast_slice(&SPRITE_CORNERS),
      usage: wgpu::BufferUsages::VERTEX,
    });
    let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Particle Buffer"),
      contents: bytemuck::cast_slice(particles),
      usage: wgpu::BufferUsages::VERTEX,
    });
    let num_particles = u32::try_from(particles.len()).unwrap_or(u32::MAX);
    log::info!("uploaded {num_particles} particles");

    Render {
      field_buffer,
      field_bind_group,
      particle_buffer,
      corners_buffer,
      render_pipeline,
      num_particles,
      clear_color: clear_color(params.background),
    }
  }

  pub fn update(&self, queue: &wgpu::Queue, field: &FieldUniform) {
    queue.write_buffer(&self.field_buffer, 0, bytemuck::cast_slice(&[*field]));
  }

  pub fn render(
    &self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group: &wgpu::BindGroup,
  ) {
    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(self.clear_color),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: None,
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      if self.num_particles > 0 {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, camera_bind_group, &[]);
        rpass.set_bind_group(1, &self.field_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.particle_buffer.slice(..));
        rpass.set_vertex_buffer(1, self.corners_buffer.slice(..));
        rpass.draw(0..SPRITE_CORNERS.len() as u32, 0..self.num_particles);
      }
    }
    queue.submit(Some(command_encoder.finish()));
  }

  /// Frees GPU memory now instead of when the last handle drops.
  pub fn release(&self) {
    self.particle_buffer.destroy();
    self.corners_buffer.destroy();
    self.field_buffer.destroy();
  }
}

impl FieldUniform {
  fn zeroed_with(params: &RenderParams) -> Self {
    FieldUniform {
      point_size: params.point_size,
      aspect: 1.0,
      ..bytemuck::Zeroable::zeroed()
    }
  }
}
