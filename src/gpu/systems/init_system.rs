// ============================================
// Init System - Инициализация просмотрщика
// ============================================

use std::sync::Arc;
use std::time::Instant;
use winit::window::Window;

use crate::gpu::core::ViewerResources;
use crate::gpu::error::Result;
use crate::gpu::player::{Camera, FlightController};
use crate::gpu::render::Renderer;
use crate::gpu::terrain::{Quadtree, TerrainSettings};

/// Система инициализации
pub struct InitSystem;

impl InitSystem {
    /// Ресурсы без GPU: квадродерево и камера
    pub fn create_resources(settings: TerrainSettings) -> ViewerResources {
        let quadtree = Quadtree::new(&settings);

        // Стартуем над центром террейна
        let mut camera = Camera::new(16.0 / 9.0);
        camera.position.y = settings.scale_y * 1.5;

        let mut flight = FlightController::new(0.2);
        flight.fly_speed = settings.scale_xz / 20.0;
        flight.fast_fly_speed = settings.scale_xz / 2.0;

        ViewerResources {
            window: None,
            renderer: None,
            settings,
            quadtree,
            camera,
            flight,
            start_time: Instant::now(),
            last_frame: Instant::now(),
            stats_timer: 0.0,
            cursor_grabbed: false,
        }
    }

    /// Инициализация рендеринга (вызывается при resumed)
    pub fn init_rendering(resources: &mut ViewerResources, window: Arc<Window>) -> Result<()> {
        let renderer = pollster::block_on(Renderer::new(window.clone(), &resources.settings))?;

        // Не начинаем под землёй
        let ground = renderer
            .terrain()
            .height_field()
            .sample(resources.camera.position.x, resources.camera.position.z, 0.0, 1.0);
        if let Some(ground) = ground {
            resources.camera.position.y = resources.camera.position.y.max(ground + 10.0);
        }

        resources.camera.resize(renderer.size().width, renderer.size().height);
        resources.window = Some(window);
        resources.renderer = Some(renderer);
        resources.start_time = Instant::now();
        resources.last_frame = Instant::now();
        Ok(())
    }
}
