use std::sync::Arc;

use crate::gpu::compute::{GpuContext, WgpuBackend};
use crate::gpu::error::{Result, TerrainError};
use crate::gpu::render::bind_groups::{patch_stride, BindGroupLayouts, FrameBindGroup, MapsBindGroup, PatchBindGroup};
use crate::gpu::render::depth::create_depth_texture;
use crate::gpu::render::patch_mesh::PatchMesh;
use crate::gpu::render::pipelines::Pipelines;
use crate::gpu::render::uniforms::FrameUniforms;
use crate::gpu::terrain::{HeightField, TerrainConfig, TerrainSettings};

use super::state::{RendererState, TerrainResources};

/// Стартовая ёмкость буфера патчей
const INITIAL_PATCH_CAPACITY: usize = 256;

/// Размер процедурной карты высот, если файла нет
const FALLBACK_HEIGHTMAP_SIZE: u32 = 512;

/// Инициализация GPU устройства и surface
pub async fn init_gpu(window: Arc<winit::window::Window>) -> Result<RendererState> {
    let size = window.inner_size();
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let surface = instance.create_surface(window).map_err(TerrainError::gpu)?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(TerrainError::gpu)?;

    log::info!("Using adapter: {:?}", adapter.get_info());

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("GPU Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(TerrainError::gpu)?;

    let device = Arc::new(device);
    let queue = Arc::new(queue);

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| surface_caps.formats.first())
        .copied()
        .ok_or_else(|| TerrainError::gpu("surface reports no supported formats"))?;
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    Ok(RendererState {
        surface,
        device,
        queue,
        config,
        size,
    })
}

/// Загрузить террейн; без файла карты высот - процедурное поле
pub fn init_terrain(settings: &TerrainSettings, ctx: &mut GpuContext<WgpuBackend>) -> Result<TerrainConfig> {
    match TerrainConfig::init(settings.clone(), ctx) {
        Ok(terrain) => Ok(terrain),
        Err(TerrainError::Io { path, source }) => {
            log::warn!(
                "Heightmap {} unavailable ({}), using a procedural height field",
                path.display(),
                source
            );
            let field = HeightField::procedural(
                FALLBACK_HEIGHTMAP_SIZE,
                0x5EED,
                settings.scale_xz,
                settings.scale_y,
            )?;
            TerrainConfig::from_height_field(settings.clone(), field, ctx)
        }
        Err(e) => Err(e),
    }
}

/// Пайплайны, сетка патча и bind groups
pub fn init_terrain_resources(
    state: &RendererState,
    ctx: &GpuContext<WgpuBackend>,
    terrain: &TerrainConfig,
) -> Result<TerrainResources> {
    let device = &state.device;

    let layouts = BindGroupLayouts::new(device);
    let pipelines = Pipelines::new(device, state.config.format, &layouts);
    let mesh = PatchMesh::new(device, terrain.settings().patch_resolution);

    let frame_uniforms = FrameUniforms::new(terrain.settings(), terrain.maps().width);
    let frame = FrameBindGroup::new(device, &layouts.frame, &frame_uniforms);

    let stride = patch_stride(device.limits().min_uniform_buffer_offset_alignment);
    let patches = PatchBindGroup::new(device, &layouts.patch, stride, INITIAL_PATCH_CAPACITY);
    let maps = MapsBindGroup::new(device, &layouts.maps, ctx, terrain.maps())?;

    let depth_texture = create_depth_texture(device, &state.config);

    Ok(TerrainResources {
        layouts,
        pipelines,
        mesh,
        frame_uniforms,
        frame,
        patches,
        maps,
        depth_texture,
    })
}
