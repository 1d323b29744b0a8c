use crate::gpu::render::uniforms::PatchUniforms;
use crate::gpu::terrain::{PatchDraw, PatchSink};

/// Листья текущего кадра в виде uniform данных
#[derive(Default)]
pub struct PatchBatch {
    patches: Vec<PatchUniforms>,
}

impl PatchBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.patches.clear();
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &[PatchUniforms] {
        &self.patches
    }

    /// Байты для буфера с dynamic offset: патч i лежит по смещению i * stride
    pub fn to_bytes(&self, stride: u64) -> Vec<u8> {
        let stride = stride as usize;
        let mut bytes = vec![0u8; stride * self.patches.len()];
        for (i, patch) in self.patches.iter().enumerate() {
            let src = bytemuck::bytes_of(patch);
            bytes[i * stride..i * stride + src.len()].copy_from_slice(src);
        }
        bytes
    }
}

impl PatchSink for PatchBatch {
    fn draw_patch(&mut self, patch: &PatchDraw) {
        self.patches.push(PatchUniforms::from(patch));
    }
}
