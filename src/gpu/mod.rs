// ============================================
// GPU Module - Террейн на квадродереве
// ============================================
// Карта высот -> compute (нормали, сплат) -> LOD квадродерево -> патчи

pub mod compute;
pub mod error;
pub mod player;
pub mod render;
pub mod terrain;

pub mod core;
pub mod systems;

pub use self::core::app::run;
