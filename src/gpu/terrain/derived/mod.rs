// ============================================
// Derived Maps - Карты нормалей и сплата
// ============================================

mod generator;

pub use generator::{
    DerivedMapGenerator, DerivedMaps, DEFAULT_SPLAT_THRESHOLDS, FLAT_SPLAT, HEIGHTMAP_NAME, NORMALMAP_NAME,
    SPLATMAP_NAME,
};
