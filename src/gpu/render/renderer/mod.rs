pub mod batch;
pub mod core;
mod passes;

use std::sync::Arc;

use crate::gpu::compute::{GpuContext, WgpuBackend};
use crate::gpu::error::Result;
use crate::gpu::player::Camera;
use crate::gpu::render::depth::create_depth_texture;
use crate::gpu::terrain::{Quadtree, TerrainConfig, TerrainSettings};

use batch::PatchBatch;
use self::core::{RendererState, TerrainResources};

pub struct Renderer {
    state: RendererState,
    /// Владеет текстурами террейна (карта высот, нормали, сплат)
    gpu: GpuContext<WgpuBackend>,
    terrain_config: TerrainConfig,
    terrain: TerrainResources,
    batch: PatchBatch,
}

impl Renderer {
    pub async fn new(window: Arc<winit::window::Window>, settings: &TerrainSettings) -> Result<Self> {
        let state = self::core::init_gpu(window).await?;

        let backend = WgpuBackend::new(Arc::clone(&state.device), Arc::clone(&state.queue))?;
        let mut gpu = GpuContext::new(backend);
        let terrain_config = self::core::init_terrain(settings, &mut gpu)?;
        let terrain = self::core::init_terrain_resources(&state, &gpu, &terrain_config)?;

        Ok(Self {
            state,
            gpu,
            terrain_config,
            terrain,
            batch: PatchBatch::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.state.size = new_size;
            self.state.config.width = new_size.width;
            self.state.config.height = new_size.height;
            self.state.surface.configure(&self.state.device, &self.state.config);
            self.terrain.depth_texture = create_depth_texture(&self.state.device, &self.state.config);
        }
    }

    /// Собрать листья и обновить uniform буферы
    pub fn update(&mut self, camera: &Camera, quadtree: &Quadtree) {
        self.terrain.frame_uniforms.update(camera);
        self.state.queue.write_buffer(
            &self.terrain.frame.buffer,
            0,
            bytemuck::cast_slice(&[self.terrain.frame_uniforms]),
        );

        self.batch.clear();
        quadtree.render(&mut self.batch);
        if self.batch.is_empty() {
            return;
        }

        self.terrain
            .patches
            .ensure_capacity(&self.state.device, &self.terrain.layouts.patch, self.batch.len());
        let bytes = self.batch.to_bytes(self.terrain.patches.stride);
        self.state.queue.write_buffer(&self.terrain.patches.buffer, 0, &bytes);
    }

    pub fn render(&mut self, quadtree: &Quadtree) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.state.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.state.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        passes::terrain_pass::render(&mut encoder, &view, &self.terrain, &self.batch, quadtree.render_mode());

        self.state.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.state.size
    }

    pub fn terrain(&self) -> &TerrainConfig {
        &self.terrain_config
    }

    pub fn gpu(&self) -> &GpuContext<WgpuBackend> {
        &self.gpu
    }

    /// Сколько патчей нарисовано в последнем кадре
    pub fn patch_count(&self) -> usize {
        self.batch.len()
    }
}
