// ============================================
// Input System - Обработка ввода
// ============================================

use winit::{
    event::ElementState,
    keyboard::KeyCode,
    window::CursorGrabMode,
};

use crate::gpu::core::ViewerResources;

/// Система обработки клавиатуры
pub struct InputSystem;

impl InputSystem {
    /// Обработка клавиатурного ввода
    pub fn process_keyboard(
        resources: &mut ViewerResources,
        keycode: KeyCode,
        state: ElementState,
    ) -> Option<InputAction> {
        let pressed = state == ElementState::Pressed;

        match keycode {
            // Escape - отпустить курсор
            KeyCode::Escape if pressed => {
                Self::grab_cursor(resources, false);
                Some(InputAction::ReleaseCursor)
            }

            // F1 - каркас / заливка
            KeyCode::F1 if pressed => {
                let mode = resources.quadtree.toggle_wireframe();
                log::info!("Render mode: {:?}", mode);
                Some(InputAction::ToggleWireframe)
            }

            // F2 - статистика квадродерева
            KeyCode::F2 if pressed => Some(InputAction::LogStats),

            _ => {
                resources.flight.process_keyboard(keycode, pressed);
                None
            }
        }
    }

    /// Обработка движения мыши
    pub fn process_mouse_motion(resources: &mut ViewerResources, delta: (f64, f64)) {
        if resources.cursor_grabbed {
            resources.flight.process_mouse(delta.0, delta.1);
        }
    }

    /// Захват/освобождение курсора
    pub fn grab_cursor(resources: &mut ViewerResources, grab: bool) {
        if let Some(window) = &resources.window {
            resources.cursor_grabbed = grab;
            if grab {
                let _ = window
                    .set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
                window.set_cursor_visible(false);
            } else {
                let _ = window.set_cursor_grab(CursorGrabMode::None);
                window.set_cursor_visible(true);
            }
        }
    }
}

/// Действия, которые могут быть вызваны вводом
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    ReleaseCursor,
    ToggleWireframe,
    LogStats,
}
