// ============================================
// Render Module - Отрисовка террейна
// ============================================

mod bind_groups;
mod depth;
mod patch_mesh;
mod pipelines;
mod renderer;
mod uniforms;

pub use patch_mesh::{PatchGeometry, PatchVertex};
pub use renderer::batch::PatchBatch;
pub use renderer::Renderer;
pub use uniforms::{FrameUniforms, PatchUniforms};
