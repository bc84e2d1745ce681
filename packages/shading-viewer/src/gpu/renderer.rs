//! GPU renderer for a planned frame.
//!
//! Per frame: the frame block (projection and lights) is uploaded once, then
//! each draw gets its own 256-byte slot in a dynamic uniform buffer for its
//! matrices and material.

use std::collections::HashMap;

use crate::error::{SetupPhase, ViewerError, ViewerResult};
use crate::gpu::mesh::{Drawable, GpuMesh};
use crate::gpu::pipeline::{self, PipelineKey, DEPTH_FORMAT};
use crate::scene::{SceneState, Shape};
use crate::shading::ShadingMode;
use crate::uniforms::{UniformBlock, DRAW_UNIFORMS_SIZE, FRAME_UNIFORMS_SIZE};

/// Maximum number of draws per frame.
/// Each draw needs its own slot in the dynamic uniform buffer.
pub const MAX_DRAWS: usize = 64;

/// Uniform buffer alignment (WebGPU minUniformBufferOffsetAlignment is typically 256 bytes)
const UNIFORM_ALIGNMENT: usize = 256;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: wgpu::Extent3d,

    frame_block: UniformBlock,
    draw_block: UniformBlock,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    meshes: HashMap<Shape, GpuMesh>,
    depth_view: wgpu::TextureView,
}

impl Renderer {
    /// Build buffers, both shading programs and every pipeline variant.
    ///
    /// Shader build failure is returned as a `ShaderBuild` error; the viewer
    /// never runs with a missing program.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> ViewerResult<Self> {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        // === Uniforms ===

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: FRAME_UNIFORMS_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // One slot per draw for dynamic uniform binding
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer (Dynamic)"),
            size: (UNIFORM_ALIGNMENT * MAX_DRAWS) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(FRAME_UNIFORMS_SIZE as u64),
                },
                count: None,
            }],
            label: Some("frame_bind_group_layout"),
        });

        let draw_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(DRAW_UNIFORMS_SIZE as u64),
                },
                count: None,
            }],
            label: Some("draw_bind_group_layout"),
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
            label: Some("frame_bind_group"),
        });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(DRAW_UNIFORMS_SIZE as u64),
                }),
            }],
            label: Some("draw_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shading Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &draw_bind_group_layout],
            push_constant_ranges: &[],
        });

        // === Programs and pipelines ===

        let mut shaders = HashMap::new();
        for mode in ShadingMode::ALL {
            let module = pipeline::create_shader_module(&device, mode.name(), &pipeline::shader_source(mode))?;
            shaders.insert(mode, module);
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut pipelines = HashMap::new();
        for key in PipelineKey::all() {
            if let Some(shader) = shaders.get(&key.shading) {
                let pipeline = pipeline::create_render_pipeline(&device, &pipeline_layout, shader, format, key);
                pipelines.insert(key, pipeline);
            }
        }
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ViewerError::new(
                SetupPhase::ShaderBuild,
                format!("Render pipeline creation failed: {}", err),
            ));
        }
        log::info!("Built {} render pipelines", pipelines.len());

        // === Geometry ===

        let mut meshes = HashMap::new();
        for shape in Shape::ALL {
            let mut mesh = GpuMesh::for_shape(shape);
            mesh.init(&device);
            meshes.insert(shape, mesh);
        }

        let depth_view = create_depth_view(&device, size.width, size.height);

        Ok(Self {
            device,
            queue,
            size,
            frame_block: UniformBlock::frame(),
            draw_block: UniformBlock::draw(),
            frame_buffer,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            pipelines,
            meshes,
            depth_view,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            };
            self.depth_view = create_depth_view(&self.device, width, height);
        }
    }

    /// Plan and draw one frame of `state` into `target`.
    pub fn render(&mut self, target: &wgpu::TextureView, state: &SceneState) -> ViewerResult<()> {
        let plan = state.plan_frame(self.aspect());
        let dispatcher = &state.dispatcher;
        let options = &state.options;

        let key = PipelineKey {
            shading: dispatcher.mode(),
            culling: options.culling,
            depth_test: options.depth_test,
            primitive: options.primitive,
        };
        let pipeline = self.pipelines.get(&key).ok_or_else(|| {
            ViewerError::new(SetupPhase::FrameRender, format!("No pipeline for {:?}", key))
        })?;

        dispatcher.upload_frame(&mut self.frame_block, &plan.projection, &plan.lights);
        self.queue
            .write_buffer(&self.frame_buffer, 0, self.frame_block.bytes());

        if plan.draws.len() > MAX_DRAWS {
            log::warn!(
                "Frame has {} draws, only the first {} are rendered",
                plan.draws.len(),
                MAX_DRAWS
            );
        }
        let draws = &plan.draws[..plan.draws.len().min(MAX_DRAWS)];

        for (i, draw) in draws.iter().enumerate() {
            dispatcher.upload_draw(&mut self.draw_block, &draw.matrices, &draw.material);
            self.queue.write_buffer(
                &self.draw_buffer,
                (i * UNIFORM_ALIGNMENT) as u64,
                self.draw_block.bytes(),
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&draw.shape) else {
                    continue;
                };
                let offset = (i * UNIFORM_ALIGNMENT) as wgpu::DynamicOffset;
                render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
                mesh.draw(&mut render_pass, pipeline, options.primitive);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("Rendered {} draws with {:?}", draws.len(), key);
        Ok(())
    }
}
