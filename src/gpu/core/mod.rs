// ============================================
// Core Module - Приложение и общие ресурсы
// ============================================

pub mod app;
mod resources;

pub use app::App;
pub use resources::{ViewerResources, DEFAULT_SETTINGS_PATH};
