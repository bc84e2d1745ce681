pub mod camera;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod panel;
pub mod scene;
pub mod uniforms;

// Lighting model
pub mod light;
pub mod lighting;
pub mod material;
pub mod shading;
pub mod space;

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
