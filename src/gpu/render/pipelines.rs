use super::bind_groups::BindGroupLayouts;
use super::depth::DEPTH_FORMAT;
use super::patch_mesh::PatchVertex;

const TERRAIN_SHADER: &str = include_str!("shaders/terrain.wgsl");

pub struct Pipelines {
    pub filled: wgpu::RenderPipeline,
    pub wireframe: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, layouts: &BindGroupLayouts) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.patch, &layouts.maps],
            push_constant_ranges: &[],
        });

        let filled = create_pipeline(
            device,
            &layout,
            &shader,
            surface_format,
            "Terrain Filled Pipeline",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
        );

        // Каркас через LineList: POLYGON_MODE_LINE есть не на всех бэкендах
        let wireframe = create_pipeline(
            device,
            &layout,
            &shader,
            surface_format,
            "Terrain Wireframe Pipeline",
            "fs_wire",
            wgpu::PrimitiveTopology::LineList,
        );

        Self { filled, wireframe }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    label: &str,
    fragment_entry: &str,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let cull_mode = match topology {
        wgpu::PrimitiveTopology::TriangleList => Some(wgpu::Face::Back),
        _ => None,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[PatchVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Greater, // Reversed-Z
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shader_fn(name: &str) -> &'static str {
        let start = TERRAIN_SHADER.find(&format!("fn {}(", name)).unwrap();
        let body = &TERRAIN_SHADER[start..];
        let end = body.find("\n}\n").unwrap();
        &body[..end]
    }

    #[test]
    fn test_vertex_height_uses_triangle_split() {
        let sample = shader_fn("sample_height");
        assert!(sample.contains("if (f.x > f.y)"));
        assert!(sample.contains("h00 + (h10 - h00) * f.x + (h11 - h10) * f.y"));
        assert!(sample.contains("h00 + (h11 - h01) * f.x + (h01 - h00) * f.y"));
        assert!(!sample.contains("mix("));
    }
}
