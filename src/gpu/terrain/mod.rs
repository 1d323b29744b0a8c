// ============================================
// Terrain Module - Террейн на карте высот
// ============================================

pub mod config;
pub mod derived;
pub mod height_field;
pub mod quadtree;
pub mod scatter;

// Re-exports
pub use config::{TerrainConfig, TerrainSettings};
pub use derived::{DerivedMapGenerator, DerivedMaps};
pub use height_field::{HeightField, INVALID_HEIGHT};
pub use quadtree::{PatchDraw, PatchSink, Quadtree, QuadtreeStats, RenderMode};
pub use scatter::ScatterSampler;
