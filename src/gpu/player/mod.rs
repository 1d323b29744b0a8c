// ============================================
// Player Module - Камера и управление
// ============================================

mod camera;
mod flight;

pub use camera::*;
pub use flight::*;
