// ============================================
// Camera - Свободная камера для облёта террейна
// ============================================

use ultraviolet::{Mat4, Vec3};

/// Предел наклона, чтобы камера не переворачивалась
pub const PITCH_LIMIT: f32 = 1.5;

pub struct Camera {
    pub position: Vec3,
    /// Поворот вокруг Y (радианы)
    pub yaw: f32,
    /// Наклон вверх/вниз (радианы)
    pub pitch: f32,

    /// Параметры проекции
    pub aspect: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 150.0, 0.0),
            yaw: 0.0,
            pitch: -0.3,
            aspect,
            fov: 70.0_f32.to_radians(),
            near: 0.5,
            far: 20000.0,
        }
    }

    /// Направление взгляда
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalized()
    }

    /// Горизонтальное направление (без pitch)
    pub fn forward_horizontal(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Вектор вправо
    pub fn right(&self) -> Vec3 {
        self.forward_horizontal().cross(Vec3::unit_y()).normalized()
    }

    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Матрица вида
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.forward(), Vec3::unit_y())
    }

    /// Перспектива с Reversed-Z (near и far поменяны местами)
    pub fn projection_matrix(&self) -> Mat4 {
        ultraviolet::projection::perspective_wgpu_dx(self.fov, self.aspect, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_follows_yaw() {
        let mut camera = Camera::new(1.0);
        camera.pitch = 0.0;
        camera.yaw = 0.0;
        assert!((camera.forward() - Vec3::new(1.0, 0.0, 0.0)).mag() < 1e-6);

        camera.yaw = std::f32::consts::FRAC_PI_2;
        assert!((camera.forward() - Vec3::new(0.0, 0.0, 1.0)).mag() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new(1.0);
        camera.rotate(0.0, 10.0);
        assert_eq!(camera.pitch, PITCH_LIMIT);
        camera.rotate(0.0, -10.0);
        assert_eq!(camera.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_resize_ignores_zero_height() {
        let mut camera = Camera::new(1.0);
        camera.resize(1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        camera.resize(800, 0);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
    }
}
