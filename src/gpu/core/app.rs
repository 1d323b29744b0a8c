// ============================================
// App - Главный обработчик приложения
// ============================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::gpu::core::{ViewerResources, DEFAULT_SETTINGS_PATH};
use crate::gpu::error::TerrainError;
use crate::gpu::systems::{InitSystem, InputAction, InputSystem, RenderSystem, UpdateSystem};
use crate::gpu::terrain::TerrainSettings;

/// Главное приложение
pub struct App {
    resources: ViewerResources,
}

impl App {
    pub fn new(settings: TerrainSettings) -> Self {
        Self {
            resources: InitSystem::create_resources(settings),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.resources.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Quadterra - F1 wireframe, F2 stats, Esc release cursor")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = InitSystem::init_rendering(&mut self.resources, window) {
            log::error!("Failed to initialize terrain renderer: {}", e);
            event_loop.exit();
            return;
        }

        // Захватываем курсор при старте
        InputSystem::grab_cursor(&mut self.resources, true);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.resources.renderer {
                    renderer.resize(physical_size);
                    self.resources.camera.resize(physical_size.width, physical_size.height);
                }
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    physical_key: PhysicalKey::Code(keycode),
                    state,
                    ..
                },
                ..
            } => {
                if let Some(InputAction::LogStats) = InputSystem::process_keyboard(&mut self.resources, keycode, state) {
                    UpdateSystem::log_stats(&self.resources);
                }
            }

            WindowEvent::MouseInput { state, .. } => {
                if state.is_pressed() && !self.resources.cursor_grabbed {
                    InputSystem::grab_cursor(&mut self.resources, true);
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.resources.last_frame).as_secs_f32();
                self.resources.last_frame = now;

                // Update
                UpdateSystem::update(&mut self.resources, dt);

                // Render
                RenderSystem::render(&mut self.resources, event_loop);

                if let Some(window) = &self.resources.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            InputSystem::process_mouse_motion(&mut self.resources, delta);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.resources.window {
            window.request_redraw();
        }
    }
}

/// Настройки из первого аргумента или assets/terrain.json
fn load_settings() -> Result<TerrainSettings, TerrainError> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

    match TerrainSettings::load(&path) {
        Err(TerrainError::Io { path, source }) => {
            log::warn!("Settings {} not readable ({}), using defaults", path.display(), source);
            Ok(TerrainSettings::default())
        }
        other => other,
    }
}

/// Запуск просмотрщика
pub fn run() {
    env_logger::init();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Invalid terrain settings: {}", e);
            return;
        }
    };

    println!("=== Controls ===");
    println!("WASD - Move");
    println!("Mouse - Look around");
    println!("Space / Shift - Up / Down");
    println!("Ctrl - Fast flight");
    println!("F1 - Toggle wireframe");
    println!("F2 - Print quadtree stats");
    println!("Escape - Release cursor");
    println!("================");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(settings);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop terminated with error: {}", e);
    }
}
