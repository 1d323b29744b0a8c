// ============================================
// Wgpu Backend - Compute dispatch на GPU
// ============================================
// Каждая операция обёрнута в error scope: ошибки валидации и нехватки
// памяти превращаются в GpuError вместо паники в обработчике wgpu.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::backend::{
    ComputeBackend, DispatchJob, FilterMode, GpuError, Kernel, TextureDesc, TextureFormat, TextureHandle,
};

/// Текстура на GPU с готовым view и сэмплером
pub struct GpuTexture {
    pub desc: TextureDesc,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    textures: Vec<GpuTexture>,
    layout: wgpu::BindGroupLayout,
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Result<Self, GpuError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Kernel Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba16Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let mut backend = Self {
            device,
            queue,
            textures: Vec::new(),
            layout,
            pipelines: HashMap::new(),
        };

        for kernel in Kernel::ALL {
            let pipeline = backend
                .scoped(|device| create_kernel_pipeline(device, &backend.layout, kernel))
                .map_err(GpuError::Dispatch)?;
            backend.pipelines.insert(kernel, pipeline);
        }

        Ok(backend)
    }

    /// GPU текстура для привязки в рендере
    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle.0 as usize)
    }

    fn get(&self, handle: TextureHandle) -> Result<&GpuTexture, GpuError> {
        self.texture(handle).ok_or(GpuError::UnknownTexture(handle.0))
    }

    /// Выполнить работу внутри error scope (validation + OOM)
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }
}

fn create_kernel_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    kernel: Kernel,
) -> wgpu::ComputePipeline {
    let source = match kernel {
        Kernel::Normalmap => include_str!("shaders/normalmap.wgsl"),
        Kernel::Splatmap => include_str!("shaders/splatmap.wgsl"),
    };

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kernel.label()),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Terrain Kernel Pipeline Layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(kernel.label()),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

fn texture_usage(format: TextureFormat) -> wgpu::TextureUsages {
    match format {
        TextureFormat::R32Float => {
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC
        }
        TextureFormat::Rgba16Float => {
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
        }
    }
}

fn bytes_per_texel(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::R32Float => 4,
        TextureFormat::Rgba16Float => 8,
    }
}

impl ComputeBackend for WgpuBackend {
    fn allocate_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::Allocation(format!(
                "zero-sized texture {}x{}",
                desc.width, desc.height
            )));
        }

        let filter = match desc.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Bilinear => wgpu::FilterMode::Linear,
        };

        let (texture, view, sampler) = self
            .scoped(|device| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Terrain Texture"),
                    size: wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu_format(desc.format),
                    usage: texture_usage(desc.format),
                    view_formats: &[],
                });

                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

                let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("Terrain Sampler"),
                    address_mode_u: wgpu::AddressMode::ClampToEdge,
                    address_mode_v: wgpu::AddressMode::ClampToEdge,
                    address_mode_w: wgpu::AddressMode::ClampToEdge,
                    mag_filter: filter,
                    min_filter: filter,
                    mipmap_filter: wgpu::FilterMode::Nearest,
                    ..Default::default()
                });

                (texture, view, sampler)
            })
            .map_err(GpuError::Allocation)?;

        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(GpuTexture {
            desc: *desc,
            texture,
            view,
            sampler,
        });
        Ok(handle)
    }

    fn upload_r32(&mut self, handle: TextureHandle, data: &[f32]) -> Result<(), GpuError> {
        let target = self.get(handle)?;
        let desc = target.desc;

        if desc.format != TextureFormat::R32Float {
            return Err(GpuError::Upload(format!("{:?} is not an R32Float texture", handle)));
        }
        if data.len() != (desc.width * desc.height) as usize {
            return Err(GpuError::Upload(format!(
                "expected {} samples, got {}",
                desc.width * desc.height,
                data.len()
            )));
        }

        self.scoped(|_| {
            write_whole_texture(&self.queue, &target.texture, &desc, bytemuck::cast_slice(data));
        })
        .map_err(GpuError::Upload)
    }

    fn fill(&mut self, handle: TextureHandle, value: [f32; 4]) -> Result<(), GpuError> {
        let target = self.get(handle)?;
        let desc = target.desc;
        let texel_count = (desc.width * desc.height) as usize;

        let bytes: Vec<u8> = match desc.format {
            TextureFormat::R32Float => bytemuck::cast_slice(&vec![value[0]; texel_count]).to_vec(),
            TextureFormat::Rgba16Float => {
                let texel = value.map(|v| half::f16::from_f32(v).to_bits());
                bytemuck::cast_slice(&vec![texel; texel_count]).to_vec()
            }
        };

        self.scoped(|_| {
            write_whole_texture(&self.queue, &target.texture, &desc, &bytes);
        })
        .map_err(GpuError::Upload)
    }

    fn dispatch(&mut self, job: &DispatchJob) -> Result<(), GpuError> {
        let input = self.get(job.input)?;
        let output = self.get(job.output)?;
        let pipeline = self
            .pipelines
            .get(&job.kernel)
            .ok_or_else(|| GpuError::Dispatch(format!("{} pipeline missing", job.kernel.label())))?;

        log::debug!(
            "{}: dispatch {}x{}x{} workgroups for {}x{}",
            job.kernel.label(),
            job.groups[0],
            job.groups[1],
            job.groups[2],
            job.params.width,
            job.params.width
        );

        self.scoped(|device| {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Terrain Kernel Params"),
                contents: bytemuck::cast_slice(&[job.params]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Terrain Kernel Bind Group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&input.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&output.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terrain Kernel Encoder"),
            });

            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(job.kernel.label()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(job.groups[0], job.groups[1], job.groups[2]);
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        })
        .map_err(GpuError::Dispatch)
    }

    fn texture_desc(&self, handle: TextureHandle) -> Option<TextureDesc> {
        self.texture(handle).map(|t| t.desc)
    }
}

fn write_whole_texture(queue: &wgpu::Queue, texture: &wgpu::Texture, desc: &TextureDesc, bytes: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytes,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * bytes_per_texel(desc.format)),
            rows_per_image: Some(desc.height),
        },
        wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        },
    );
}
