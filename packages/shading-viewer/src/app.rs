//! Interactive window.
//!
//! One cooperative loop: window events only mutate the input state (or
//! apply a panel edit for hotkeys); each redraw advances the camera once,
//! plans the frame and renders it.

use std::sync::Arc;
use std::time::Instant;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::config::ViewerConfig;
use crate::error::{SetupPhase, ViewerError, ViewerResult};
use crate::gpu::renderer::Renderer;
use crate::input::{InputState, Key, PointerEvent};
use crate::panel::{ControlPanel, ControlValue};
use crate::scene::SceneState;

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Space => Key::Space,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::Tab => Key::Tab,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyZ => Key::Z,
        KeyCode::KeyR => Key::R,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

/// Panel edit bound to a hotkey, computed from the current state.
fn hotkey_edit(key: Key, state: &SceneState) -> Option<(String, ControlValue)> {
    let options = &state.options;
    let toggle_light = |i: usize| {
        let enabled = state.lights.get(i).is_some_and(|l| l.enabled);
        Some((format!("light{}.enabled", i), ControlValue::Bool(!enabled)))
    };
    match key {
        Key::Tab => Some((
            "options.camera_mode".into(),
            ControlValue::Choice(state.camera.mode().next().index()),
        )),
        Key::P => Some((
            "options.shading".into(),
            ControlValue::Choice(state.dispatcher.mode().toggled().index()),
        )),
        Key::L => Some((
            "options.light_space".into(),
            ControlValue::Choice(options.light_space.toggled().index()),
        )),
        Key::H => Some(("options.headlamp".into(), ControlValue::Bool(!options.headlamp))),
        Key::C => Some(("options.culling".into(), ControlValue::Bool(!options.culling))),
        Key::Z => Some(("options.depth_test".into(), ControlValue::Bool(!options.depth_test))),
        Key::Digit1 => toggle_light(0),
        Key::Digit2 => toggle_light(1),
        Key::Digit3 => toggle_light(2),
        _ => None,
    }
}

struct Viewer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    renderer: Renderer,
    state: SceneState,
    panel: ControlPanel,
    input: InputState,
    cursor: PhysicalPosition<f64>,
    title: String,
}

impl Viewer {
    async fn new(
        window: Arc<Window>,
        title: String,
        state: SceneState,
        mut panel: ControlPanel,
    ) -> ViewerResult<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(Arc::clone(&window)).map_err(|e| {
            ViewerError::new(SetupPhase::Surface, format!("Failed to create surface: {}", e))
        })?;

        let (adapter, device, queue) = crate::gpu::request_device(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        // Lit colors are display values, so skip the sRGB encode
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| ViewerError::new(SetupPhase::Surface, "Surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = Renderer::new(device, queue, format, config.width, config.height)?;

        // Uploads happen every frame; an edit only needs a redraw
        let redraw = Arc::clone(&window);
        panel.subscribe(move |_, _| redraw.request_redraw());

        let viewer = Self {
            window,
            surface,
            config,
            renderer,
            state,
            panel,
            input: InputState::new(),
            cursor: PhysicalPosition::new(0.0, 0.0),
            title,
        };
        viewer.update_title();
        Ok(viewer)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(self.renderer.device(), &self.config);
            self.renderer.resize(size.width, size.height);
        }
    }

    fn update_title(&self) {
        self.window.set_title(&format!(
            "{} | {} | lights: {} | camera: {}",
            self.title,
            self.state.dispatcher.mode().name(),
            self.state.options.light_space.name(),
            self.state.camera.mode().name()
        ));
    }

    /// Returns true when the viewer should exit.
    fn handle_key(&mut self, key: Key, pressed: bool) -> bool {
        if !pressed {
            self.input.key_up(key);
            return false;
        }
        if !self.input.key_down(key) {
            // Auto-repeat
            return false;
        }

        match key {
            Key::Escape => return true,
            Key::R => self.state.camera.reset(),
            _ => {
                if let Some((name, value)) = hotkey_edit(key, &self.state) {
                    if let Err(e) = self.panel.apply(&mut self.state, &name, value) {
                        log::warn!("Hotkey edit rejected: {}", e);
                    }
                }
            }
        }
        self.update_title();
        false
    }

    /// Returns true when the viewer should exit.
    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => return true,
            WindowEvent::Resized(size) => self.resize(*size),
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        return self.handle_key(key, event.state == ElementState::Pressed);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                self.input.pointer(PointerEvent::Move {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = (self.cursor.x as f32, self.cursor.y as f32);
                let event = match state {
                    ElementState::Pressed => PointerEvent::Down { x, y },
                    ElementState::Released => PointerEvent::Up { x, y },
                };
                self.input.pointer(event);
            }
            _ => {}
        }
        false
    }

    fn update(&mut self, dt: f32) {
        self.state.advance(&mut self.input, dt);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if let Err(e) = self.renderer.render(&view, &self.state) {
            log::error!("{}", e);
        }
        output.present();
        Ok(())
    }
}

/// Open the window and run until closed.
pub fn run(config: ViewerConfig, overrides: &[String]) -> anyhow::Result<()> {
    let (state, panel) = config.build_state(overrides)?;

    let event_loop = EventLoop::new().map_err(|e| {
        ViewerError::new(SetupPhase::Window, format!("Failed to create event loop: {}", e))
    })?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .map_err(|e| ViewerError::new(SetupPhase::Window, format!("Failed to create window: {}", e)))?,
    );

    let mut viewer = pollster::block_on(Viewer::new(
        Arc::clone(&window),
        config.title.clone(),
        state,
        panel,
    ))?;

    println!("Controls:");
    println!("  Tab     - Cycle camera mode (orbit / free-fly / look)");
    println!("  Drag    - Orbit or look, depending on mode");
    println!("  WASD    - Move (free-fly), Space/Shift up/down");
    println!("  P       - Toggle Phong / Gouraud");
    println!("  L       - Toggle light space (camera / world)");
    println!("  H       - Toggle headlamp spotlight");
    println!("  C / Z   - Toggle backface culling / depth test");
    println!("  1 2 3   - Toggle lights");
    println!("  R       - Reset camera");
    println!("  Esc     - Exit");

    let mut last_frame = Instant::now();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { ref event, window_id }
                if window_id == window.id() && !matches!(event, WindowEvent::RedrawRequested) =>
            {
                if viewer.handle_window_event(event) {
                    elwt.exit();
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::WindowEvent {
                event: WindowEvent::RedrawRequested,
                window_id,
            } if window_id == window.id() => {
                let now = Instant::now();
                let dt = (now - last_frame).as_secs_f32();
                last_frame = now;

                viewer.update(dt);
                match viewer.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        viewer.resize(window.inner_size())
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Surface out of memory");
                        elwt.exit();
                    }
                    Err(e) => log::warn!("Surface error: {:?}", e),
                }
            }
            _ => {}
        })
        .map_err(|e| ViewerError::new(SetupPhase::Window, format!("Event loop error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::LightSpace;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ShiftRight), Some(Key::Shift));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_hotkeys_toggle_through_panel() {
        let mut state = SceneState::default();
        let mut panel = ControlPanel::new(&state);

        let (name, value) = hotkey_edit(Key::L, &state).unwrap();
        panel.apply(&mut state, &name, value).unwrap();
        assert_eq!(state.options.light_space, LightSpace::Camera);

        let (name, value) = hotkey_edit(Key::Digit2, &state).unwrap();
        panel.apply(&mut state, &name, value).unwrap();
        assert!(state.lights.get(1).unwrap().enabled);

        let (name, value) = hotkey_edit(Key::Tab, &state).unwrap();
        panel.apply(&mut state, &name, value).unwrap();
        assert_eq!(state.camera.mode(), crate::camera::ControlMode::FreeFly);

        assert!(hotkey_edit(Key::W, &state).is_none());
    }
}
