use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::gpu::compute::{GpuContext, TextureHandle, WgpuBackend};
use crate::gpu::error::{Result, TerrainError};
use crate::gpu::terrain::DerivedMaps;

use super::uniforms::{FrameUniforms, PatchUniforms};

/// Шаг между патчами в буфере с dynamic offset
pub fn patch_stride(alignment: u32) -> u64 {
    let size = std::mem::size_of::<PatchUniforms>() as u64;
    let align = alignment.max(1) as u64;
    size.div_ceil(align) * align
}

pub struct BindGroupLayouts {
    pub frame: wgpu::BindGroupLayout,
    pub patch: wgpu::BindGroupLayout,
    pub maps: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let patch = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Patch Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<PatchUniforms>() as u64),
                },
                count: None,
            }],
        });

        // Карта высот читается через textureLoad (R32Float не фильтруется),
        // нормали и сплат сэмплируются билинейно
        let maps = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Maps Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self { frame, patch, maps }
    }
}

pub struct FrameBindGroup {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl FrameBindGroup {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, initial: &FrameUniforms) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*initial]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BG"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }
}

/// Буфер патчей; растёт, когда листьев становится больше
pub struct PatchBindGroup {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub stride: u64,
    pub capacity: usize,
}

impl PatchBindGroup {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, stride: u64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Patch Uniform Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Patch BG"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<PatchUniforms>() as u64),
                }),
            }],
        });

        log::debug!("Patch uniform buffer: {} slots x {} bytes", capacity, stride);

        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Пересоздать буфер, если `needed` патчей не помещается
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, needed: usize) {
        if needed > self.capacity {
            *self = Self::new(device, layout, self.stride, needed.next_power_of_two());
        }
    }
}

/// Карты террейна для фрагментного и вершинного шейдеров
pub struct MapsBindGroup {
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

impl MapsBindGroup {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        ctx: &GpuContext<WgpuBackend>,
        maps: &DerivedMaps,
    ) -> Result<Self> {
        let backend = ctx.backend();
        let view = |handle: TextureHandle| {
            backend
                .texture(handle)
                .map(|t| &t.view)
                .ok_or(TerrainError::UnknownTexture(handle.id()))
        };
        let heightmap = view(maps.heightmap)?;
        let normalmap = view(maps.normalmap)?;
        let splatmap = view(maps.splatmap)?;

        // Террейн тайлится, поэтому Repeat
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Terrain Maps Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Maps BG"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(heightmap),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normalmap),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(splatmap),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Ok(Self { sampler, bind_group })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_stride_respects_alignment() {
        assert_eq!(patch_stride(256), 256);
        assert_eq!(patch_stride(64), 192);
        assert_eq!(patch_stride(32), 160);
        assert_eq!(patch_stride(0), 160);
    }
}
