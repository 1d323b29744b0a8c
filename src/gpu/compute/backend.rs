// ============================================
// Compute Backend - Абстракция GPU dispatch
// ============================================
// Террейн не знает про wgpu напрямую: ему нужны только
// аллокация текстур, загрузка карты высот и dispatch ядра.

use bytemuck::{Pod, Zeroable};

/// Размер workgroup в ядрах (16x16 потоков)
pub const WORKGROUP_SIZE: u32 = 16;

/// Количество workgroup по одной оси для текстуры ширины `width`
#[inline]
pub fn workgroup_count(width: u32) -> u32 {
    width.div_ceil(WORKGROUP_SIZE)
}

/// Непрозрачный дескриптор текстуры
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Формат хранения текстуры
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Одноканальная карта высот
    R32Float,
    /// 4 канала с плавающей точкой (нормали, сплат)
    Rgba16Float,
}

/// Фильтрация при сэмплировании
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Bilinear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

impl TextureDesc {
    /// Квадратная карта высот (читается только через textureLoad)
    pub fn heightmap(width: u32) -> Self {
        Self {
            width,
            height: width,
            format: TextureFormat::R32Float,
            filter: FilterMode::Nearest,
        }
    }

    /// Производная карта (normal/splat): RGBA float + билинейная фильтрация
    pub fn derived_map(width: u32) -> Self {
        Self {
            width,
            height: width,
            format: TextureFormat::Rgba16Float,
            filter: FilterMode::Bilinear,
        }
    }
}

/// Compute-ядра террейна
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Карта высот -> карта нормалей (Sobel)
    Normalmap,
    /// Карта нормалей -> веса слоёв по уклону
    Splatmap,
}

impl Kernel {
    pub const ALL: [Kernel; 2] = [Kernel::Normalmap, Kernel::Splatmap];

    pub fn label(self) -> &'static str {
        match self {
            Kernel::Normalmap => "Normalmap Kernel",
            Kernel::Splatmap => "Splatmap Kernel",
        }
    }
}

/// Uniform параметры ядра (одинаковый layout для обоих ядер)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub width: u32,
    pub strength: f32,
    /// Пороги уклона (n.y) по убыванию: flat > gentle > steep
    pub flat: f32,
    pub gentle: f32,
    pub steep: f32,
    pub _pad: [f32; 3],
}

impl KernelParams {
    pub fn normalmap(width: u32, strength: f32) -> Self {
        Self {
            width,
            strength,
            flat: 0.0,
            gentle: 0.0,
            steep: 0.0,
            _pad: [0.0; 3],
        }
    }

    pub fn splatmap(width: u32, thresholds: [f32; 3]) -> Self {
        Self {
            width,
            strength: 0.0,
            flat: thresholds[0],
            gentle: thresholds[1],
            steep: thresholds[2],
            _pad: [0.0; 3],
        }
    }
}

/// Один dispatch: входная текстура -> выходная
#[derive(Clone, Copy, Debug)]
pub struct DispatchJob {
    pub kernel: Kernel,
    pub input: TextureHandle,
    pub output: TextureHandle,
    pub params: KernelParams,
    pub groups: [u32; 3],
}

impl DispatchJob {
    /// Dispatch на всю квадратную текстуру
    pub fn covering(kernel: Kernel, input: TextureHandle, output: TextureHandle, params: KernelParams) -> Self {
        let groups = workgroup_count(params.width);
        Self {
            kernel,
            input,
            output,
            params,
            groups: [groups, groups, 1],
        }
    }
}

/// Ошибки GPU backend
#[derive(thiserror::Error, Debug)]
pub enum GpuError {
    #[error("texture allocation failed: {0}")]
    Allocation(String),

    #[error("texture upload failed: {0}")]
    Upload(String),

    #[error("compute dispatch failed: {0}")]
    Dispatch(String),

    #[error("unknown texture handle {0}")]
    UnknownTexture(u32),
}

/// Примитивы, которые террейн требует от GPU
pub trait ComputeBackend {
    fn allocate_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError>;

    /// Записать одноканальные данные (карту высот) в текстуру
    fn upload_r32(&mut self, handle: TextureHandle, data: &[f32]) -> Result<(), GpuError>;

    /// Залить всю текстуру одним значением
    fn fill(&mut self, handle: TextureHandle, value: [f32; 4]) -> Result<(), GpuError>;

    fn dispatch(&mut self, job: &DispatchJob) -> Result<(), GpuError>;

    fn texture_desc(&self, handle: TextureHandle) -> Option<TextureDesc>;
}
