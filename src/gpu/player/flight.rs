// ============================================
// Flight Controller - Управление камерой
// ============================================
// WASD - движение, Space - вверх, Shift - вниз
// Ctrl - быстрый полёт, мышь - обзор

use ultraviolet::Vec3;
use winit::keyboard::KeyCode;

use super::camera::Camera;

pub struct FlightController {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub fast: bool,

    mouse_dx: f32,
    mouse_dy: f32,

    pub sensitivity: f32,
    pub fly_speed: f32,
    /// Скорость с Ctrl
    pub fast_fly_speed: f32,
    /// Минимальная высота над поверхностью
    pub ground_clearance: f32,
}

impl FlightController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            forward: false,
            backward: false,
            left: false,
            right: false,
            up: false,
            down: false,
            fast: false,
            mouse_dx: 0.0,
            mouse_dy: 0.0,
            sensitivity,
            fly_speed: 60.0,
            fast_fly_speed: 600.0,
            ground_clearance: 2.0,
        }
    }

    /// true, если клавиша относится к полёту
    pub fn process_keyboard(&mut self, key: KeyCode, pressed: bool) -> bool {
        match key {
            KeyCode::KeyW => self.forward = pressed,
            KeyCode::KeyS => self.backward = pressed,
            KeyCode::KeyA => self.left = pressed,
            KeyCode::KeyD => self.right = pressed,
            KeyCode::Space => self.up = pressed,
            KeyCode::ShiftLeft => self.down = pressed,
            KeyCode::ControlLeft => self.fast = pressed,
            _ => return false,
        }
        true
    }

    /// Дельта мыши накапливается до следующего update
    pub fn process_mouse(&mut self, dx: f64, dy: f64) {
        self.mouse_dx += dx as f32;
        self.mouse_dy += dy as f32;
    }

    /// Сдвинуть камеру. `ground` - высота поверхности под камерой, если известна.
    pub fn update(&mut self, camera: &mut Camera, dt: f32, ground: Option<f32>) {
        camera.rotate(
            self.mouse_dx * self.sensitivity * 0.01,
            -self.mouse_dy * self.sensitivity * 0.01,
        );
        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;

        let forward = camera.forward();
        let right = camera.right();

        let mut dir = Vec3::zero();
        if self.forward { dir += forward; }
        if self.backward { dir -= forward; }
        if self.right { dir += right; }
        if self.left { dir -= right; }
        if self.up { dir += Vec3::unit_y(); }
        if self.down { dir -= Vec3::unit_y(); }

        if dir.mag_sq() > 0.0 {
            let speed = if self.fast { self.fast_fly_speed } else { self.fly_speed };
            camera.position += dir.normalized() * speed * dt;
        }

        if let Some(ground) = ground {
            camera.position.y = camera.position.y.max(ground + self.ground_clearance);
        }
    }
}
