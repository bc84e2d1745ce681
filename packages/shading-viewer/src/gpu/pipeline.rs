use crate::error::{SetupPhase, ViewerError, ViewerResult};
use crate::gpu::mesh::Vertex;
use crate::scene::PrimitiveMode;
use crate::shading::ShadingMode;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const LIGHTING_WGSL: &str = include_str!("lighting.wgsl");
const PHONG_WGSL: &str = include_str!("phong.wgsl");
const GOURAUD_WGSL: &str = include_str!("gouraud.wgsl");

/// Everything that selects a distinct render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shading: ShadingMode,
    pub culling: bool,
    pub depth_test: bool,
    pub primitive: PrimitiveMode,
}

impl PipelineKey {
    /// Every combination, for building the cache up front.
    pub fn all() -> Vec<PipelineKey> {
        let mut keys = Vec::new();
        for shading in ShadingMode::ALL {
            for culling in [true, false] {
                for depth_test in [true, false] {
                    for primitive in PrimitiveMode::ALL {
                        keys.push(PipelineKey {
                            shading,
                            culling,
                            depth_test,
                            primitive,
                        });
                    }
                }
            }
        }
        keys
    }
}

/// Full WGSL source of one shading program: the shared light model followed
/// by the stage entry points.
pub fn shader_source(mode: ShadingMode) -> String {
    let stage = match mode {
        ShadingMode::Phong => PHONG_WGSL,
        ShadingMode::Gouraud => GOURAUD_WGSL,
    };
    format!("{}\n{}", LIGHTING_WGSL, stage)
}

/// Compile a WGSL module, turning validation errors into a fatal
/// `ShaderBuild` error instead of the default uncaptured-error panic.
pub fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> ViewerResult<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(ViewerError::new(
            SetupPhase::ShaderBuild,
            format!("{} shader failed to build: {}", label, err),
        )),
        None => Ok(module),
    }
}

pub fn create_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let label = format!(
        "{} Pipeline (cull={}, depth={}, {})",
        key.shading.name(),
        key.culling,
        key.depth_test,
        key.primitive.name()
    );

    let (topology, cull_mode) = match key.primitive {
        PrimitiveMode::Triangles => (
            wgpu::PrimitiveTopology::TriangleList,
            key.culling.then_some(wgpu::Face::Back),
        ),
        PrimitiveMode::Points => (wgpu::PrimitiveTopology::PointList, None),
    };

    let depth_stencil = wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: key.depth_test,
        depth_compare: if key.depth_test {
            wgpu::CompareFunction::Less
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            // Setting this to anything other than Fill requires Features::NON_FILL_POLYGON_MODE
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth_stencil),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
