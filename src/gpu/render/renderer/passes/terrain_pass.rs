use crate::gpu::render::renderer::batch::PatchBatch;
use crate::gpu::render::renderer::core::TerrainResources;
use crate::gpu::terrain::RenderMode;

/// Цвет неба за террейном
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.55,
    g: 0.72,
    b: 0.92,
    a: 1.0,
};

/// Один draw на каждый лист квадродерева
pub fn render(
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    terrain: &TerrainResources,
    batch: &PatchBatch,
    mode: RenderMode,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Terrain Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &terrain.depth_texture,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0.0), // Reversed-Z: clear to 0 instead of 1
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    let (pipeline, indices, index_count) = match mode {
        RenderMode::Filled => (
            &terrain.pipelines.filled,
            &terrain.mesh.triangle_buffer,
            terrain.mesh.triangle_count,
        ),
        RenderMode::Wireframe => (
            &terrain.pipelines.wireframe,
            &terrain.mesh.line_buffer,
            terrain.mesh.line_count,
        ),
    };

    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, &terrain.frame.bind_group, &[]);
    render_pass.set_bind_group(2, &terrain.maps.bind_group, &[]);
    render_pass.set_vertex_buffer(0, terrain.mesh.vertex_buffer.slice(..));
    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);

    for i in 0..batch.len() {
        let offset = (i as u64 * terrain.patches.stride) as u32;
        render_pass.set_bind_group(1, &terrain.patches.bind_group, &[offset]);
        render_pass.draw_indexed(0..index_count, 0, 0..1);
    }
}
