// ============================================
// Height Field - Карта высот и запросы высоты
// ============================================
// Нормализованные высоты [0, 1] в row-major массиве width x width.
// Мировые запросы заворачиваются по краям (террейн тайлится),
// поэтому правый сосед последнего столбца - первый столбец.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::gpu::error::{Result, TerrainError};

/// Высота-маркер "здесь ставить нельзя" (под водой / слишком высоко)
pub const INVALID_HEIGHT: f32 = -900.0;

/// Неизменяемое поле высот
#[derive(Clone, Debug)]
pub struct HeightField {
    width: u32,
    samples: Vec<f32>,
    scale_xz: f32,
    scale_y: f32,
}

impl HeightField {
    /// Поле из готовых нормализованных значений
    pub fn from_samples(width: u32, samples: Vec<f32>, scale_xz: f32, scale_y: f32) -> Result<Self> {
        if width == 0 {
            return Err(TerrainError::invariant("height field width must be positive"));
        }
        let expected = width as usize * width as usize;
        if samples.len() != expected {
            return Err(TerrainError::invariant(format!(
                "height field of width {} needs {} samples, got {}",
                width,
                expected,
                samples.len()
            )));
        }

        if !(scale_xz.is_finite() && scale_xz > 0.0) {
            return Err(TerrainError::invariant(format!("horizontal scale must be positive, got {}", scale_xz)));
        }
        if !(scale_y.is_finite() && scale_y > 0.0) {
            return Err(TerrainError::invariant(format!("vertical scale must be positive, got {}", scale_y)));
        }

        Ok(Self {
            width,
            samples,
            scale_xz,
            scale_y,
        })
    }

    /// Загрузить карту высот из изображения (красный канал).
    /// `sixteen_bit` - читать 16-битные значения вместо 8-битных.
    pub fn load(path: impl AsRef<Path>, sixteen_bit: bool, scale_xz: f32, scale_y: f32) -> Result<Self> {
        let path = path.as_ref();

        let reader = image::ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| TerrainError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let image = reader.decode().map_err(|source| match source {
            image::ImageError::IoError(source) => TerrainError::Io {
                path: path.to_path_buf(),
                source,
            },
            source => TerrainError::Decode {
                path: path.to_path_buf(),
                source,
            },
        })?;

        if image.width() != image.height() {
            return Err(TerrainError::NotSquare {
                path: path.to_path_buf(),
                width: image.width(),
                height: image.height(),
            });
        }

        let samples: Vec<f32> = if sixteen_bit {
            image
                .to_rgba16()
                .pixels()
                .map(|p| p.0[0] as f32 / u16::MAX as f32)
                .collect()
        } else {
            image
                .to_rgba8()
                .pixels()
                .map(|p| p.0[0] as f32 / u8::MAX as f32)
                .collect()
        };

        log::info!(
            "Loaded heightmap {} ({}x{}, {}-bit)",
            path.display(),
            image.width(),
            image.height(),
            if sixteen_bit { 16 } else { 8 }
        );

        Self::from_samples(image.width(), samples, scale_xz, scale_y)
    }

    /// Процедурное тайлящееся поле (value noise, 5 октав).
    /// Запасной вариант, когда карты высот нет на диске.
    pub fn procedural(width: u32, seed: u64, scale_xz: f32, scale_y: f32) -> Result<Self> {
        if width == 0 {
            return Err(TerrainError::invariant("height field width must be positive"));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let w = width as usize;
        let mut samples = vec![0.0f32; w * w];
        let mut amplitude = 1.0;
        let mut period = 4usize;

        for _ in 0..5 {
            let lattice: Vec<f32> = (0..period * period).map(|_| rng.random::<f32>()).collect();
            let at = |i: usize, j: usize| lattice[(j % period) * period + (i % period)];

            for z in 0..w {
                let gz = z as f32 / w as f32 * period as f32;
                let (j, tz) = (gz.floor() as usize, smoothstep(gz.fract()));
                for x in 0..w {
                    let gx = x as f32 / w as f32 * period as f32;
                    let (i, tx) = (gx.floor() as usize, smoothstep(gx.fract()));

                    let top = lerp(at(i, j), at(i + 1, j), tx);
                    let bottom = lerp(at(i, j + 1), at(i + 1, j + 1), tx);
                    samples[z * w + x] += amplitude * lerp(top, bottom, tz);
                }
            }

            amplitude *= 0.5;
            period *= 2;
        }

        let (lo, hi) = samples
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        let range = (hi - lo).max(f32::EPSILON);
        for h in &mut samples {
            *h = ((*h - lo) / range).clamp(0.0, 1.0);
        }

        Self::from_samples(width, samples, scale_xz, scale_y)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn scale_xz(&self) -> f32 {
        self.scale_xz
    }

    #[inline]
    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    /// Нормализованная высота в текселе (i, j) с заворачиванием
    #[inline]
    pub fn normalized_at(&self, i: i64, j: i64) -> f32 {
        let w = self.width as i64;
        let x = i.rem_euclid(w) as usize;
        let z = j.rem_euclid(w) as usize;
        self.samples[z * self.width as usize + x]
    }

    /// Минимальная и максимальная нормализованная высота
    pub fn min_max(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    /// Мировая высота в точке (x, z) или None, если нормализованная
    /// высота вне [min, max].
    ///
    /// Ячейка делится диагональю на два треугольника: при u > v берётся
    /// нижний (h0, h1, h3), иначе верхний (h0, h2, h3).
    pub fn sample(&self, x: f32, z: f32, min: f32, max: f32) -> Option<f32> {
        let w = self.width as f32;
        let half = self.scale_xz * 0.5;

        let gx = ((x - half) / self.scale_xz).rem_euclid(1.0) * w;
        let gz = ((z - half) / self.scale_xz).rem_euclid(1.0) * w;

        let fx = gx.floor();
        let fz = gz.floor();
        let u = gx - fx;
        let v = gz - fz;
        let (x0, z0) = (fx as i64, fz as i64);

        let h0 = self.normalized_at(x0, z0);
        let h1 = self.normalized_at(x0 + 1, z0);
        let h2 = self.normalized_at(x0, z0 + 1);
        let h3 = self.normalized_at(x0 + 1, z0 + 1);

        let h = triangle_height([h0, h1, h2, h3], u, v);
        if h < min || h > max {
            return None;
        }
        Some(h * self.scale_y)
    }

    /// То же, что `sample`, но с маркером INVALID_HEIGHT вместо None
    #[inline]
    pub fn height_at(&self, x: f32, z: f32, min: f32, max: f32) -> f32 {
        self.sample(x, z, min, max).unwrap_or(INVALID_HEIGHT)
    }
}

/// Высота внутри ячейки [h0, h1, h2, h3] = (x0,z0), (x0+1,z0), (x0,z0+1), (x0+1,z0+1).
/// Тот же выбор треугольника делает `sample_height` в terrain.wgsl.
#[inline]
pub fn triangle_height(h: [f32; 4], u: f32, v: f32) -> f32 {
    let [h0, h1, h2, h3] = h;
    let (du, dv) = if u > v {
        (h1 - h0, h3 - h1)
    } else {
        (h3 - h2, h2 - h0)
    };
    h0 + du * u + dv * v
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 2x2 поле: h0=0, h1=1, h2=1, h3=2
    fn quad_field(h: [f32; 4]) -> HeightField {
        HeightField::from_samples(2, h.to_vec(), 1.0, 1.0).unwrap()
    }

    /// Мировая координата для дробной позиции сетки (scale_xz = 1, width = 2)
    fn world(grid: f32) -> f32 {
        grid / 2.0 + 0.5
    }

    #[test]
    fn test_upper_triangle_when_u_below_v() {
        let field = quad_field([0.0, 1.0, 1.0, 2.0]);
        // u=0.25 < v=0.75: dU = h3-h2 = 1, dV = h2-h0 = 1
        let h = field.height_at(world(0.25), world(0.75), 0.0, 2.0);
        assert_eq!(h, 0.0 + 1.0 * 0.25 + 1.0 * 0.75);
    }

    #[test]
    fn test_lower_triangle_when_u_above_v() {
        let field = quad_field([0.0, 1.0, 1.0, 2.0]);
        // u=0.75 > v=0.25: dU = h1-h0 = 1, dV = h3-h1 = 1
        let h = field.height_at(world(0.75), world(0.25), 0.0, 2.0);
        assert_eq!(h, 0.0 + 1.0 * 0.75 + 1.0 * 0.25);
    }

    #[test]
    fn test_triangle_choice_matters_on_non_planar_cell() {
        // h0=0, h1=1, h2=0, h3=0
        let field = quad_field([0.0, 1.0, 0.0, 0.0]);
        // Нижний треугольник: 0 + 1*0.75 + (0-1)*0.25 = 0.5
        assert_eq!(field.height_at(world(0.75), world(0.25), 0.0, 1.0), 0.5);
        // Верхний треугольник: 0 + (0-0)*0.25 + (0-0)*0.75 = 0
        assert_eq!(field.height_at(world(0.25), world(0.75), 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_sentinel_outside_bounds() {
        let field = HeightField::from_samples(8, vec![0.5; 64], 100.0, 40.0).unwrap();
        for i in 0..20 {
            let x = i as f32 * 13.7 - 120.0;
            let z = i as f32 * -7.3 + 55.0;
            assert_eq!(field.height_at(x, z, 0.6, 1.0), INVALID_HEIGHT);
            assert!(field.sample(x, z, 0.6, 1.0).is_none());
            assert_eq!(field.height_at(x, z, 0.0, 1.0), 0.5 * 40.0);
        }
    }

    #[test]
    fn test_world_queries_wrap() {
        let samples: Vec<f32> = (0..16).map(|i| i as f32 / 15.0).collect();
        let field = HeightField::from_samples(4, samples, 64.0, 10.0).unwrap();
        let a = field.height_at(3.0, -7.0, 0.0, 1.0);
        let b = field.height_at(3.0 + 64.0, -7.0 - 128.0, 0.0, 1.0);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_from_samples_rejects_wrong_length() {
        let result = HeightField::from_samples(4, vec![0.0; 15], 1.0, 1.0);
        assert!(matches!(result, Err(TerrainError::InvariantViolation(_))));
    }

    #[test]
    fn test_from_samples_rejects_bad_scales() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let xz = HeightField::from_samples(2, vec![0.0; 4], bad, 1.0);
            assert!(matches!(xz, Err(TerrainError::InvariantViolation(_))), "scale_xz = {}", bad);
            let y = HeightField::from_samples(2, vec![0.0; 4], 1.0, bad);
            assert!(matches!(y, Err(TerrainError::InvariantViolation(_))), "scale_y = {}", bad);
        }
        assert!(matches!(
            HeightField::procedural(16, 1, 0.0, 1.0),
            Err(TerrainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_triangle_height_corners_and_diagonal() {
        let h = [0.0, 1.0, 3.0, 2.0];
        assert_eq!(triangle_height(h, 0.0, 0.0), 0.0);
        assert_eq!(triangle_height(h, 1.0, 0.0), 1.0);
        assert_eq!(triangle_height(h, 0.0, 1.0), 3.0);
        assert_eq!(triangle_height(h, 1.0, 1.0), 2.0);
        // На диагонали оба треугольника дают h0 + (h3 - h0) * t
        assert_eq!(triangle_height(h, 0.5, 0.5), 1.0);
        // Билинейная смесь дала бы 1.5 в центре, треугольник даёт 1.0
        let bilinear = lerp(lerp(h[0], h[1], 0.5), lerp(h[2], h[3], 0.5), 0.5);
        assert_ne!(triangle_height(h, 0.5, 0.5), bilinear);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = HeightField::load("definitely/not/here.png", false, 1.0, 1.0);
        assert!(matches!(result, Err(TerrainError::Io { .. })));
    }

    #[test]
    fn test_load_non_square_image() {
        let path = std::env::temp_dir().join("quadterra_non_square.png");
        image::GrayImage::new(4, 2).save(&path).unwrap();

        let result = HeightField::load(&path, false, 1.0, 1.0);
        assert!(matches!(result, Err(TerrainError::NotSquare { width: 4, height: 2, .. })));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_reads_red_channel() {
        let path = std::env::temp_dir().join("quadterra_red_channel.png");
        let mut img = image::RgbImage::new(2, 2);
        img.put_pixel(1, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 255, 255]));
        img.save(&path).unwrap();

        let field = HeightField::load(&path, false, 1.0, 1.0).unwrap();
        assert_eq!(field.samples(), &[0.0, 1.0, 0.0, 0.0]);

        let field16 = HeightField::load(&path, true, 1.0, 1.0).unwrap();
        assert_eq!(field16.samples(), &[0.0, 1.0, 0.0, 0.0]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_procedural_field_is_normalized_and_seeded() {
        let a = HeightField::procedural(64, 11, 512.0, 60.0).unwrap();
        let b = HeightField::procedural(64, 11, 512.0, 60.0).unwrap();
        let c = HeightField::procedural(64, 12, 512.0, 60.0).unwrap();

        assert_eq!(a.samples(), b.samples());
        assert_ne!(a.samples(), c.samples());

        let (lo, hi) = a.min_max();
        assert!(lo >= 0.0 && hi <= 1.0);
        assert!(hi - lo > 0.5);
    }

    proptest! {
        #[test]
        fn prop_height_query_is_deterministic(x in -5000.0f32..5000.0, z in -5000.0f32..5000.0) {
            let samples: Vec<f32> = (0..64).map(|i| ((i * 37) % 64) as f32 / 63.0).collect();
            let field = HeightField::from_samples(8, samples, 512.0, 80.0).unwrap();
            let a = field.height_at(x, z, -1.0, 2.0);
            let b = field.height_at(x, z, -1.0, 2.0);
            prop_assert_eq!(a.to_bits(), b.to_bits());
            prop_assert!(a >= -1e-3 && a <= 80.0 + 1e-3);
        }
    }
}
