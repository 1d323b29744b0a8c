// ============================================
// Patch Mesh - Общая сетка для всех патчей
// ============================================
// Единичный квадрат [0,1]² из resolution x resolution квадов.
// Высота берётся в вершинном шейдере из карты высот, поэтому
// одна сетка рисуется для каждого листа квадродерева.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    /// (x, z) в единичном квадрате
    pub position: [f32; 2],
}

impl PatchVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PatchVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Геометрия сетки на CPU
#[derive(Clone, Debug)]
pub struct PatchGeometry {
    pub vertices: Vec<PatchVertex>,
    /// Треугольники для заливки
    pub triangles: Vec<u32>,
    /// Рёбра для каркаса (LineList)
    pub lines: Vec<u32>,
}

impl PatchGeometry {
    pub fn grid(resolution: u32) -> Self {
        let n = resolution.max(1);
        let row = n + 1;
        let step = 1.0 / n as f32;

        let mut vertices = Vec::with_capacity((row * row) as usize);
        for z in 0..row {
            for x in 0..row {
                vertices.push(PatchVertex {
                    position: [x as f32 * step, z as f32 * step],
                });
            }
        }

        let mut triangles = Vec::with_capacity((n * n * 6) as usize);
        for z in 0..n {
            for x in 0..n {
                let i0 = z * row + x;
                let i1 = i0 + 1;
                let i2 = i0 + row;
                let i3 = i2 + 1;
                // CCW при взгляде сверху (+Y)
                triangles.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
            }
        }

        let mut lines = Vec::with_capacity((n * row * 4) as usize);
        for z in 0..row {
            for x in 0..n {
                let i = z * row + x;
                lines.extend_from_slice(&[i, i + 1]);
            }
        }
        for z in 0..n {
            for x in 0..row {
                let i = z * row + x;
                lines.extend_from_slice(&[i, i + row]);
            }
        }

        Self {
            vertices,
            triangles,
            lines,
        }
    }
}

/// Буферы сетки на GPU
pub struct PatchMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub triangle_buffer: wgpu::Buffer,
    pub triangle_count: u32,
    pub line_buffer: wgpu::Buffer,
    pub line_count: u32,
}

impl PatchMesh {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let geometry = PatchGeometry::grid(resolution);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Patch Vertices"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let triangle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Patch Triangles"),
            contents: bytemuck::cast_slice(&geometry.triangles),
            usage: wgpu::BufferUsages::INDEX,
        });
        let line_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Patch Lines"),
            contents: bytemuck::cast_slice(&geometry.lines),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            triangle_buffer,
            triangle_count: geometry.triangles.len() as u32,
            line_buffer,
            line_count: geometry.lines.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_counts() {
        let g = PatchGeometry::grid(4);
        assert_eq!(g.vertices.len(), 25);
        assert_eq!(g.triangles.len(), 4 * 4 * 6);
        // 2 * n * (n + 1) рёбер по 2 индекса
        assert_eq!(g.lines.len(), 2 * 4 * 5 * 2);
        assert!(g.triangles.iter().chain(&g.lines).all(|&i| (i as usize) < g.vertices.len()));
    }

    #[test]
    fn test_grid_spans_unit_square() {
        let g = PatchGeometry::grid(8);
        assert_eq!(g.vertices.first().unwrap().position, [0.0, 0.0]);
        assert_eq!(g.vertices.last().unwrap().position, [1.0, 1.0]);
    }

    #[test]
    fn test_triangles_face_up() {
        let g = PatchGeometry::grid(2);
        for tri in g.triangles.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| g.vertices[i as usize].position);
            // Проекция на XZ: нормаль (b-a) x (c-a) направлена в +Y, если y-компонента > 0
            let cross_y = (b[1] - a[1]) * (c[0] - a[0]) - (b[0] - a[0]) * (c[1] - a[1]);
            assert!(cross_y > 0.0);
        }
    }

    #[test]
    fn test_zero_resolution_falls_back_to_single_quad() {
        let g = PatchGeometry::grid(0);
        assert_eq!(g.vertices.len(), 4);
        assert_eq!(g.triangles.len(), 6);
    }
}
