pub mod mesh;
pub mod pipeline;
pub mod renderer;

use crate::error::{SetupPhase, ViewerError, ViewerResult};

/// Pick an adapter (compatible with `surface` when given) and open a device.
pub async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> ViewerResult<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| ViewerError::new(SetupPhase::Adapter, "No suitable GPU adapter found"))?;

    log::info!("Using adapter: {}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .map_err(|e| ViewerError::with_source(SetupPhase::Device, "Failed to create device", e))?;

    Ok((adapter, device, queue))
}
