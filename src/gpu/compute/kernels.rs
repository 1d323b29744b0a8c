// ============================================
// Kernels - CPU-эталон compute шейдеров
// ============================================
// Та же математика, что в shaders/normalmap.wgsl и shaders/splatmap.wgsl.
// Нужен для CpuBackend и для проверки корректности без GPU.

use super::backend::{Kernel, KernelParams, WORKGROUP_SIZE};

/// Нормаль "строго вверх" (запасная карта нормалей)
pub const FLAT_NORMAL: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

/// Минимальная сила нормалей (1/strength не должен улететь в бесконечность)
const MIN_STRENGTH: f32 = 1e-4;

/// Чтение тексела с зажимом к краю
#[inline]
fn texel(input: &[[f32; 4]], width: u32, x: i32, y: i32) -> [f32; 4] {
    let max = width as i32 - 1;
    let cx = x.clamp(0, max) as usize;
    let cy = y.clamp(0, max) as usize;
    input[cy * width as usize + cx]
}

/// Нормаль в текселе (x, y): Sobel 3x3 по красному каналу
pub fn normal_texel(input: &[[f32; 4]], width: u32, x: u32, y: u32, strength: f32) -> [f32; 4] {
    let (x, y) = (x as i32, y as i32);
    let h = |dx: i32, dy: i32| texel(input, width, x + dx, y + dy)[0];

    let z0 = h(-1, -1);
    let z1 = h(0, -1);
    let z2 = h(1, -1);
    let z3 = h(-1, 0);
    let z4 = h(1, 0);
    let z5 = h(-1, 1);
    let z6 = h(0, 1);
    let z7 = h(1, 1);

    let nx = z0 + 2.0 * z3 + z5 - z2 - 2.0 * z4 - z7;
    let nz = z0 + 2.0 * z1 + z2 - z5 - 2.0 * z6 - z7;
    let ny = 1.0 / strength.max(MIN_STRENGTH);

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    [nx / len, ny / len, nz / len, 1.0]
}

/// Веса 4 слоёв по уклону нормали (one-hot)
pub fn splat_texel(normal: [f32; 4], params: &KernelParams) -> [f32; 4] {
    let slope = normal[1];
    if slope > params.flat {
        [1.0, 0.0, 0.0, 0.0]
    } else if slope > params.gentle {
        [0.0, 1.0, 0.0, 0.0]
    } else if slope > params.steep {
        [0.0, 0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

/// Выполнить ядро над всей сеткой workgroup.
/// Потоки за пределами текстуры ничего не пишут, как и в шейдере.
pub fn run(kernel: Kernel, input: &[[f32; 4]], output: &mut [[f32; 4]], params: &KernelParams, groups: [u32; 3]) {
    let width = params.width;
    let threads_x = groups[0] * WORKGROUP_SIZE;
    let threads_y = groups[1] * WORKGROUP_SIZE;

    for y in 0..threads_y.min(width) {
        for x in 0..threads_x.min(width) {
            let idx = (y * width + x) as usize;
            output[idx] = match kernel {
                Kernel::Normalmap => normal_texel(input, width, x, y, params.strength),
                Kernel::Splatmap => splat_texel(input[idx], params),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(width: u32, f: impl Fn(u32, u32) -> f32) -> Vec<[f32; 4]> {
        let mut out = Vec::with_capacity((width * width) as usize);
        for y in 0..width {
            for x in 0..width {
                out.push([f(x, y), 0.0, 0.0, 1.0]);
            }
        }
        out
    }

    #[test]
    fn test_flat_field_gives_up_normal() {
        let input = heights(8, |_, _| 0.5);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(normal_texel(&input, 8, x, y, 12.0), FLAT_NORMAL);
            }
        }
    }

    #[test]
    fn test_slope_along_x_tilts_normal_against_gradient() {
        // Высота растёт по x -> нормаль смотрит в -x
        let input = heights(8, |x, _| x as f32 * 0.1);
        let n = normal_texel(&input, 8, 4, 4, 1.0);
        assert!(n[0] < 0.0);
        assert!(n[2].abs() < 1e-6);
        assert!(n[1] > 0.0);

        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_edges_are_clamped() {
        // На краю соседи за границей равны крайнему текселу
        let input = heights(4, |x, _| x as f32);
        let n = normal_texel(&input, 4, 0, 0, 1.0);
        // z0,z3,z5 = 0 (clamp), z2,z4,z7 = 1 -> nx = -4
        let expected_len = (16.0f32 + 1.0).sqrt();
        assert!((n[0] - (-4.0 / expected_len)).abs() < 1e-6);
    }

    #[test]
    fn test_splat_thresholds_are_one_hot() {
        let params = KernelParams::splatmap(1, [0.9, 0.75, 0.5]);
        assert_eq!(splat_texel([0.0, 0.95, 0.0, 1.0], &params), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(splat_texel([0.0, 0.8, 0.0, 1.0], &params), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(splat_texel([0.0, 0.6, 0.0, 1.0], &params), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(splat_texel([0.0, 0.2, 0.0, 1.0], &params), [0.0, 0.0, 0.0, 1.0]);
        // Граница не включается в верхний слой
        assert_eq!(splat_texel([0.0, 0.9, 0.0, 1.0], &params), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_run_covers_partial_workgroups() {
        let width = 20; // 2 workgroup по оси, последний неполный
        let input = heights(width, |_, _| 0.0);
        let mut output = vec![[0.0; 4]; (width * width) as usize];
        let params = KernelParams::normalmap(width, 4.0);
        run(Kernel::Normalmap, &input, &mut output, &params, [2, 2, 1]);
        assert!(output.iter().all(|t| *t == FLAT_NORMAL));
    }
}
