use std::sync::Arc;

use crate::gpu::render::bind_groups::{BindGroupLayouts, FrameBindGroup, MapsBindGroup, PatchBindGroup};
use crate::gpu::render::patch_mesh::PatchMesh;
use crate::gpu::render::pipelines::Pipelines;
use crate::gpu::render::uniforms::FrameUniforms;

/// Основное состояние рендерера (GPU ресурсы)
pub struct RendererState {
    pub surface: wgpu::Surface<'static>,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
}

/// Всё, что нужно для отрисовки патчей
pub struct TerrainResources {
    pub layouts: BindGroupLayouts,
    pub pipelines: Pipelines,
    pub mesh: PatchMesh,
    pub frame_uniforms: FrameUniforms,
    pub frame: FrameBindGroup,
    pub patches: PatchBindGroup,
    pub maps: MapsBindGroup,
    pub depth_texture: wgpu::TextureView,
}
