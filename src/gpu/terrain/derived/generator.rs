// ============================================
// Derived Map Generator - Однократный compute проход
// ============================================
// Карта высот -> карта нормалей -> карта сплата.
// Каждая карта регистрируется в GpuContext под фиксированным именем,
// поэтому повторная генерация заканчивается AlreadyRegistered.

use crate::gpu::compute::kernels::FLAT_NORMAL;
use crate::gpu::compute::{
    ComputeBackend, DispatchJob, GpuContext, GpuError, Kernel, KernelParams, TextureDesc, TextureHandle,
};
use crate::gpu::error::{Result, TerrainError};
use crate::gpu::terrain::height_field::HeightField;

pub const HEIGHTMAP_NAME: &str = "terrain_heightmap";
pub const NORMALMAP_NAME: &str = "terrain_normalmap";
pub const SPLATMAP_NAME: &str = "terrain_splatmap";

/// Пороги уклона [flat, gentle, steep] по убыванию
pub const DEFAULT_SPLAT_THRESHOLDS: [f32; 3] = [0.9, 0.75, 0.5];

/// Запасной сплат: всё покрыто первым (плоским) слоем
pub const FLAT_SPLAT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Результат генерации
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedMaps {
    pub heightmap: TextureHandle,
    pub normalmap: TextureHandle,
    pub splatmap: TextureHandle,
    pub width: u32,
}

pub struct DerivedMapGenerator<'a, B: ComputeBackend> {
    ctx: &'a mut GpuContext<B>,
    splat_thresholds: [f32; 3],
}

impl<'a, B: ComputeBackend> DerivedMapGenerator<'a, B> {
    pub fn new(ctx: &'a mut GpuContext<B>) -> Self {
        Self {
            ctx,
            splat_thresholds: DEFAULT_SPLAT_THRESHOLDS,
        }
    }

    pub fn with_thresholds(mut self, thresholds: [f32; 3]) -> Self {
        self.splat_thresholds = thresholds;
        self
    }

    /// Загрузить поле высот в R32Float текстуру `terrain_heightmap`
    pub fn upload_heightmap(&mut self, field: &HeightField) -> Result<TextureHandle> {
        let handle = self.ctx.create(HEIGHTMAP_NAME, &TextureDesc::heightmap(field.width()))?;
        self.ctx.backend_mut().upload_r32(handle, field.samples())?;
        Ok(handle)
    }

    /// Карта нормалей из карты высот (Sobel)
    pub fn generate_normalmap(&mut self, heightmap: TextureHandle, width: u32, strength: f32) -> Result<TextureHandle> {
        self.check_input(heightmap, width)?;
        let output = self.ctx.create(NORMALMAP_NAME, &TextureDesc::derived_map(width))?;
        let job = DispatchJob::covering(Kernel::Normalmap, heightmap, output, KernelParams::normalmap(width, strength));
        self.dispatch_or_fill(&job, FLAT_NORMAL)?;
        log::info!("Generated normal map {}x{} (strength {})", width, width, strength);
        Ok(output)
    }

    /// Карта сплата из карты нормалей. Требует готовую карту нормалей.
    pub fn generate_splatmap(&mut self, normalmap: TextureHandle, width: u32) -> Result<TextureHandle> {
        self.check_input(normalmap, width)?;

        let output = self.ctx.create(SPLATMAP_NAME, &TextureDesc::derived_map(width))?;
        let job = DispatchJob::covering(
            Kernel::Splatmap,
            normalmap,
            output,
            KernelParams::splatmap(width, self.splat_thresholds),
        );
        self.dispatch_or_fill(&job, FLAT_SPLAT)?;
        log::info!("Generated splat map {}x{} (thresholds {:?})", width, width, self.splat_thresholds);
        Ok(output)
    }

    /// Обе карты по порядку: сначала нормали, затем сплат
    pub fn generate(&mut self, heightmap: TextureHandle, width: u32, strength: f32) -> Result<DerivedMaps> {
        let normalmap = self.generate_normalmap(heightmap, width, strength)?;
        let splatmap = self.generate_splatmap(normalmap, width)?;

        Ok(DerivedMaps {
            heightmap,
            normalmap,
            splatmap,
            width,
        })
    }

    /// Вход должен существовать и совпадать по размеру с выходом
    fn check_input(&self, input: TextureHandle, width: u32) -> Result<()> {
        let desc = self
            .ctx
            .backend()
            .texture_desc(input)
            .ok_or(TerrainError::UnknownTexture(input.id()))?;
        if desc.width != width || desc.height != width {
            return Err(TerrainError::invariant(format!(
                "input texture {:?} is {}x{}, derived map requested {}x{}",
                input, desc.width, desc.height, width, width
            )));
        }
        Ok(())
    }

    /// Ошибка dispatch не фатальна: текстура заливается `fallback`.
    /// Ошибка заливки - фатальна.
    fn dispatch_or_fill(&mut self, job: &DispatchJob, fallback: [f32; 4]) -> Result<()> {
        match self.ctx.backend_mut().dispatch(job) {
            Ok(()) => Ok(()),
            Err(GpuError::Dispatch(msg)) => {
                log::error!("{} failed: {}. Falling back to {:?}", job.kernel.label(), msg, fallback);
                self.ctx
                    .backend_mut()
                    .fill(job.output, fallback)
                    .map_err(|e| TerrainError::gpu(format!("fallback fill after {} failed: {}", job.kernel.label(), e)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
