// ============================================
// Resources - Общие ресурсы просмотрщика
// ============================================

use std::sync::Arc;
use std::time::Instant;
use winit::window::Window;

use crate::gpu::player::{Camera, FlightController};
use crate::gpu::render::Renderer;
use crate::gpu::terrain::{Quadtree, TerrainSettings};

/// Путь к настройкам, если не передан аргументом
pub const DEFAULT_SETTINGS_PATH: &str = "assets/terrain.json";

/// Все ресурсы в одном месте
pub struct ViewerResources {
    // Window & Rendering
    pub window: Option<Arc<Window>>,
    pub renderer: Option<Renderer>,

    // Terrain
    pub settings: TerrainSettings,
    pub quadtree: Quadtree,

    // Camera
    pub camera: Camera,
    pub flight: FlightController,

    // Timing
    pub start_time: Instant,
    pub last_frame: Instant,
    /// Секунды до следующего лога статистики
    pub stats_timer: f32,

    // Input state
    pub cursor_grabbed: bool,
}
