use anyhow::Result;
use clap::{Parser, Subcommand};
use glam::Vec2;
use std::path::{Path, PathBuf};

use crate::config::ViewerConfig;
use crate::error::{SetupPhase, ViewerError, ViewerResult};
use crate::gpu::renderer::Renderer;
use crate::scene::SceneState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive viewer
    View {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Control override, e.g. `light0.kind=spotlight` (repeatable)
        #[arg(long = "set")]
        overrides: Vec<String>,
    },
    /// Render the scene to PNG without a window
    Render {
        /// Output PNG path. With more than one frame, an index is appended.
        #[arg(long)]
        out: PathBuf,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Control override, e.g. `options.shading=gouraud` (repeatable)
        #[arg(long = "set")]
        overrides: Vec<String>,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Number of frames
        #[arg(long, default_value_t = 1)]
        frames: u32,

        /// Horizontal orbit drag (pixels) applied between frames
        #[arg(long, default_value_t = 0.0)]
        orbit_step: f32,
    },
}

fn load_config(path: Option<&Path>) -> ViewerResult<ViewerConfig> {
    match path {
        Some(path) => ViewerConfig::load(path),
        None => Ok(ViewerConfig::default()),
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::View { config, overrides } => {
            let config = load_config(config.as_deref())?;
            crate::app::run(config, &overrides)?;
        }
        Commands::Render {
            out,
            config,
            overrides,
            width,
            height,
            frames,
            orbit_step,
        } => {
            let config = load_config(config.as_deref())?;
            let (state, _panel) = config.build_state(&overrides)?;
            pollster::block_on(render_offline(state, &out, width, height, frames, orbit_step))?;
        }
    }
    Ok(())
}

/// `out` for a single frame, `out` with a `_NNNNN` suffix otherwise.
fn frame_path(out: &Path, index: u32, frames: u32) -> PathBuf {
    if frames <= 1 {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let ext = out
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    out.with_file_name(format!("{}_{:05}.{}", stem, index, ext))
}

/// Bytes per row of the readback buffer, padded to the copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = std::mem::size_of::<u32>() as u32 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded + (align - unpadded % align) % align
}

async fn render_offline(
    mut state: SceneState,
    out: &Path,
    width: u32,
    height: u32,
    frames: u32,
    orbit_step: f32,
) -> ViewerResult<()> {
    if width == 0 || height == 0 {
        return Err(ViewerError::new(
            SetupPhase::Config,
            format!("Output size must be positive, got {}x{}", width, height),
        ));
    }

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ViewerError::with_source(SetupPhase::FrameSave, "Failed to create output directory", e)
        })?;
    }

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let (_adapter, device, queue) = crate::gpu::request_device(&instance, None).await?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("Target Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };

    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let padded_bytes_per_row = padded_bytes_per_row(width);
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut renderer = Renderer::new(device, queue, texture_desc.format, width, height)?;

    log::info!("Rendering {} frame(s) to {:?}", frames.max(1), out);

    for i in 0..frames.max(1) {
        if i > 0 && orbit_step != 0.0 {
            state.camera.orbit(Vec2::new(orbit_step, 0.0));
        }

        renderer.render(&texture_view, &state)?;

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ViewerError::with_source(SetupPhase::FrameRender, "Readback never completed", e))?
            .map_err(|e| ViewerError::with_source(SetupPhase::FrameRender, "Failed to map readback buffer", e))?;

        let data = buffer_slice.get_mapped_range();
        let row_bytes = (width * 4) as usize;
        let mut unpadded = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            unpadded.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        output_buffer.unmap();

        let path = frame_path(out, i, frames);
        image::save_buffer(&path, &unpadded, width, height, image::ColorType::Rgba8).map_err(|e| {
            ViewerError::with_source(SetupPhase::FrameSave, format!("Failed to write {:?}", path), e)
        })?;
        log::debug!("Saved {:?}", path);
    }

    println!("Done.");
    Ok(())
}
