// ============================================
// CPU Backend - Программная реализация dispatch
// ============================================
// Хранит текстуры в памяти и выполняет ядра из kernels.rs.
// Используется в тестах и в headless инструментах.

use super::backend::{ComputeBackend, DispatchJob, GpuError, Kernel, TextureDesc, TextureHandle, WORKGROUP_SIZE};
use super::kernels;

struct CpuTexture {
    desc: TextureDesc,
    texels: Vec<[f32; 4]>,
}

/// Backend без GPU: текстуры - это Vec<[f32; 4]>
#[derive(Default)]
pub struct CpuBackend {
    textures: Vec<CpuTexture>,
    /// Журнал выполненных dispatch (ядро, количество групп)
    dispatches: Vec<(Kernel, [u32; 3])>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Содержимое текстуры (row-major)
    pub fn texels(&self, handle: TextureHandle) -> Option<&[[f32; 4]]> {
        self.textures.get(handle.0 as usize).map(|t| t.texels.as_slice())
    }

    pub fn dispatch_log(&self) -> &[(Kernel, [u32; 3])] {
        &self.dispatches
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn get(&self, handle: TextureHandle) -> Result<&CpuTexture, GpuError> {
        self.textures
            .get(handle.0 as usize)
            .ok_or(GpuError::UnknownTexture(handle.0))
    }

    fn get_mut(&mut self, handle: TextureHandle) -> Result<&mut CpuTexture, GpuError> {
        self.textures
            .get_mut(handle.0 as usize)
            .ok_or(GpuError::UnknownTexture(handle.0))
    }
}

impl ComputeBackend for CpuBackend {
    fn allocate_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::Allocation(format!(
                "zero-sized texture {}x{}",
                desc.width, desc.height
            )));
        }

        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(CpuTexture {
            desc: *desc,
            texels: vec![[0.0; 4]; (desc.width * desc.height) as usize],
        });
        Ok(handle)
    }

    fn upload_r32(&mut self, handle: TextureHandle, data: &[f32]) -> Result<(), GpuError> {
        let texture = self.get_mut(handle)?;
        if data.len() != texture.texels.len() {
            return Err(GpuError::Upload(format!(
                "expected {} samples, got {}",
                texture.texels.len(),
                data.len()
            )));
        }

        for (texel, &h) in texture.texels.iter_mut().zip(data) {
            *texel = [h, 0.0, 0.0, 1.0];
        }
        Ok(())
    }

    fn fill(&mut self, handle: TextureHandle, value: [f32; 4]) -> Result<(), GpuError> {
        let texture = self.get_mut(handle)?;
        texture.texels.fill(value);
        Ok(())
    }

    fn dispatch(&mut self, job: &DispatchJob) -> Result<(), GpuError> {
        let width = job.params.width;
        let input_desc = self.get(job.input)?.desc;
        let output_desc = self.get(job.output)?.desc;

        if input_desc.width != width || output_desc.width != width {
            return Err(GpuError::Dispatch(format!(
                "{}: texture size mismatch (input {}, output {}, params {})",
                job.kernel.label(),
                input_desc.width,
                output_desc.width,
                width
            )));
        }
        if job.input == job.output {
            return Err(GpuError::Dispatch(format!(
                "{}: input and output alias the same texture",
                job.kernel.label()
            )));
        }

        let covered = job.groups[0] * WORKGROUP_SIZE >= width && job.groups[1] * WORKGROUP_SIZE >= width;
        if !covered {
            log::warn!(
                "{}: dispatch {:?} does not cover a {}x{} texture",
                job.kernel.label(),
                job.groups,
                width,
                width
            );
        }

        let input = self.get(job.input)?.texels.clone();
        let output = &mut self.get_mut(job.output)?.texels;
        kernels::run(job.kernel, &input, output, &job.params, job.groups);

        self.dispatches.push((job.kernel, job.groups));
        Ok(())
    }

    fn texture_desc(&self, handle: TextureHandle) -> Option<TextureDesc> {
        self.textures.get(handle.0 as usize).map(|t| t.desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::compute::backend::KernelParams;

    #[test]
    fn test_upload_and_dispatch_normalmap() {
        let mut backend = CpuBackend::new();
        let height = backend.allocate_texture(&TextureDesc::heightmap(4)).unwrap();
        let normal = backend.allocate_texture(&TextureDesc::derived_map(4)).unwrap();
        backend.upload_r32(height, &[0.25; 16]).unwrap();

        let job = DispatchJob::covering(Kernel::Normalmap, height, normal, KernelParams::normalmap(4, 2.0));
        backend.dispatch(&job).unwrap();

        assert!(backend.texels(normal).unwrap().iter().all(|t| *t == kernels::FLAT_NORMAL));
        assert_eq!(backend.dispatch_log(), &[(Kernel::Normalmap, [1, 1, 1])]);
    }

    #[test]
    fn test_upload_rejects_wrong_length() {
        let mut backend = CpuBackend::new();
        let height = backend.allocate_texture(&TextureDesc::heightmap(4)).unwrap();
        assert!(matches!(backend.upload_r32(height, &[0.0; 15]), Err(GpuError::Upload(_))));
    }

    #[test]
    fn test_dispatch_rejects_size_mismatch() {
        let mut backend = CpuBackend::new();
        let a = backend.allocate_texture(&TextureDesc::heightmap(4)).unwrap();
        let b = backend.allocate_texture(&TextureDesc::derived_map(8)).unwrap();
        let job = DispatchJob::covering(Kernel::Normalmap, a, b, KernelParams::normalmap(4, 1.0));
        assert!(matches!(backend.dispatch(&job), Err(GpuError::Dispatch(_))));
    }

    #[test]
    fn test_unknown_handle() {
        let mut backend = CpuBackend::new();
        assert!(matches!(
            backend.fill(TextureHandle(3), [0.0; 4]),
            Err(GpuError::UnknownTexture(3))
        ));
    }
}
