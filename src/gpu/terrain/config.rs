// ============================================
// Terrain Config - Настройки и инициализация террейна
// ============================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::gpu::compute::{ComputeBackend, GpuContext};
use crate::gpu::error::{Result, TerrainError};
use crate::gpu::terrain::derived::{DerivedMapGenerator, DerivedMaps, DEFAULT_SPLAT_THRESHOLDS};
use crate::gpu::terrain::height_field::HeightField;
use crate::gpu::terrain::quadtree::LOD_LEVELS;

/// Настройки террейна (JSON)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub heightmap: PathBuf,
    #[serde(alias = "scaleXz")]
    pub scale_xz: f32,
    #[serde(alias = "scaleY")]
    pub scale_y: f32,
    #[serde(alias = "rootNodes")]
    pub root_nodes: u32,
    #[serde(alias = "normalStrength")]
    pub normal_strength: f32,
    /// Дистанции разбиения по уровням LOD
    #[serde(alias = "lodRanges")]
    pub lod_ranges: [u32; LOD_LEVELS],
    #[serde(alias = "use16BitHeightmap")]
    pub use_16bit_heightmap: bool,
    pub morphing: bool,
    /// Запас дистанции перед слиянием (0 = сливать сразу за range)
    #[serde(alias = "lodHysteresis")]
    pub lod_hysteresis: f32,
    #[serde(alias = "splatThresholds")]
    pub splat_thresholds: [f32; 3],
    /// Квадов на сторону патча
    #[serde(alias = "patchResolution")]
    pub patch_resolution: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            heightmap: PathBuf::from("assets/heightmap.png"),
            scale_xz: 1024.0,
            scale_y: 128.0,
            root_nodes: 4,
            normal_strength: 8.0,
            lod_ranges: [1024, 512, 256, 128, 64, 32, 16, 8],
            use_16bit_heightmap: false,
            morphing: true,
            lod_hysteresis: 0.0,
            splat_thresholds: DEFAULT_SPLAT_THRESHOLDS,
            patch_resolution: 32,
        }
    }
}

impl TerrainSettings {
    /// Прочитать и проверить JSON файл
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TerrainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded terrain settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_nodes == 0 {
            return Err(TerrainError::invariant("rootNodes must be at least 1"));
        }
        if !(self.scale_xz > 0.0) || !(self.scale_y > 0.0) {
            return Err(TerrainError::invariant(format!(
                "terrain scales must be positive (scaleXz {}, scaleY {})",
                self.scale_xz, self.scale_y
            )));
        }
        if !(self.normal_strength > 0.0) {
            return Err(TerrainError::invariant(format!(
                "normalStrength must be positive, got {}",
                self.normal_strength
            )));
        }
        if self.patch_resolution == 0 {
            return Err(TerrainError::invariant("patchResolution must be at least 1"));
        }
        if self.lod_hysteresis < 0.0 {
            return Err(TerrainError::invariant("lodHysteresis must not be negative"));
        }
        let [flat, gentle, steep] = self.splat_thresholds;
        if !(flat >= gentle && gentle >= steep) {
            return Err(TerrainError::invariant(format!(
                "splat thresholds must be descending, got {:?}",
                self.splat_thresholds
            )));
        }
        Ok(())
    }

    /// Размер корневого патча в мире
    #[inline]
    pub fn root_patch_size(&self) -> f32 {
        self.scale_xz / self.root_nodes as f32
    }

    /// Начало зоны морфинга для каждого уровня:
    /// range[i] - (scaleXz / rootNodes) / 2^(i+1), не меньше нуля
    pub fn lod_morph_areas(&self) -> [f32; LOD_LEVELS] {
        let patch = self.root_patch_size();
        std::array::from_fn(|i| {
            let half_patch = patch / (1u32 << (i + 1)) as f32;
            (self.lod_ranges[i] as f32 - half_patch).max(0.0)
        })
    }
}

/// Готовый террейн: настройки, поле высот и производные карты
pub struct TerrainConfig {
    settings: TerrainSettings,
    height_field: HeightField,
    maps: DerivedMaps,
}

impl TerrainConfig {
    /// Загрузить карту высот и один раз построить производные карты
    pub fn init<B: ComputeBackend>(settings: TerrainSettings, ctx: &mut GpuContext<B>) -> Result<Self> {
        settings.validate()?;
        let field = HeightField::load(
            &settings.heightmap,
            settings.use_16bit_heightmap,
            settings.scale_xz,
            settings.scale_y,
        )?;
        Self::from_height_field(settings, field, ctx)
    }

    /// То же для готового (например, процедурного) поля
    pub fn from_height_field<B: ComputeBackend>(
        settings: TerrainSettings,
        field: HeightField,
        ctx: &mut GpuContext<B>,
    ) -> Result<Self> {
        settings.validate()?;

        let maps = {
            let mut generator = DerivedMapGenerator::new(ctx).with_thresholds(settings.splat_thresholds);
            let heightmap = generator.upload_heightmap(&field)?;
            generator.generate(heightmap, field.width(), settings.normal_strength)?
        };

        let (lo, hi) = field.min_max();
        log::info!(
            "Terrain ready: {}x{} heightmap, heights [{:.3}, {:.3}], scale {} x {}",
            field.width(),
            field.width(),
            lo,
            hi,
            settings.scale_xz,
            settings.scale_y
        );

        Ok(Self {
            settings,
            height_field: field,
            maps,
        })
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    pub fn maps(&self) -> &DerivedMaps {
        &self.maps
    }

    /// Мировая высота или INVALID_HEIGHT
    pub fn height_at(&self, x: f32, z: f32, min: f32, max: f32) -> f32 {
        self.height_field.height_at(x, z, min, max)
    }
}
