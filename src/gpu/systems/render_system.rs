// ============================================
// Render System - Система рендеринга
// ============================================

use winit::event_loop::ActiveEventLoop;

use crate::gpu::core::ViewerResources;

/// Система рендеринга
pub struct RenderSystem;

impl RenderSystem {
    /// Отрисовать листья квадродерева
    pub fn render(resources: &mut ViewerResources, event_loop: &ActiveEventLoop) {
        let Some(renderer) = &mut resources.renderer else { return };

        renderer.update(&resources.camera, &resources.quadtree);

        match renderer.render(&resources.quadtree) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) => {
                log::warn!("Surface lost, reconfiguring");
                renderer.resize(renderer.size());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}
