// ============================================
// Scatter - Случайная расстановка объектов по террейну
// ============================================
// Точки с высотой вне [min, max] (вода, пики) отбрасываются.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::gpu::terrain::height_field::HeightField;

/// Во сколько раз попыток больше, чем нужных точек
const ATTEMPTS_PER_POINT: usize = 16;

pub struct ScatterSampler<'a> {
    field: &'a HeightField,
    min: f32,
    max: f32,
}

impl<'a> ScatterSampler<'a> {
    /// `min`/`max` - допустимая нормализованная высота
    pub fn new(field: &'a HeightField, min: f32, max: f32) -> Self {
        Self { field, min, max }
    }

    /// До `count` точек [x, y, z]; одинаковый seed -> одинаковый результат
    pub fn scatter(&self, count: usize, seed: u64) -> Vec<[f32; 3]> {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = self.field.scale_xz() * 0.5;
        let mut points = Vec::with_capacity(count);

        let attempts = count.saturating_mul(ATTEMPTS_PER_POINT);
        for _ in 0..attempts {
            if points.len() == count {
                break;
            }
            let x = rng.random_range(-half..half);
            let z = rng.random_range(-half..half);
            if let Some(y) = self.field.sample(x, z, self.min, self.max) {
                points.push([x, y, z]);
            }
        }

        if points.len() < count {
            log::debug!(
                "Scatter placed {}/{} points within heights [{}, {}]",
                points.len(),
                count,
                self.min,
                self.max
            );
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::terrain::height_field::INVALID_HEIGHT;

    fn half_flooded() -> HeightField {
        // Левая половина низкая (0.1), правая высокая (0.8)
        let samples = (0..64).map(|i| if i % 8 < 4 { 0.1 } else { 0.8 }).collect();
        HeightField::from_samples(8, samples, 256.0, 50.0).unwrap()
    }

    #[test]
    fn test_points_lie_on_valid_heights() {
        let field = half_flooded();
        let sampler = ScatterSampler::new(&field, 0.3, 1.0);
        let points = sampler.scatter(200, 7);

        assert!(!points.is_empty());
        for [x, y, z] in points {
            assert!((-128.0..128.0).contains(&x) && (-128.0..128.0).contains(&z));
            assert_ne!(y, INVALID_HEIGHT);
            assert_eq!(y, field.height_at(x, z, 0.3, 1.0));
            assert!(y >= 0.3 * 50.0);
        }
    }

    #[test]
    fn test_same_seed_same_points() {
        let field = half_flooded();
        let sampler = ScatterSampler::new(&field, 0.0, 1.0);
        assert_eq!(sampler.scatter(50, 99), sampler.scatter(50, 99));
        assert_eq!(sampler.scatter(50, 99).len(), 50);
    }

    #[test]
    fn test_impossible_band_gives_nothing() {
        let field = half_flooded();
        let sampler = ScatterSampler::new(&field, 0.9, 1.0);
        assert!(sampler.scatter(10, 1).is_empty());
    }
}
