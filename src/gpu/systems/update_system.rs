// ============================================
// Update System - Камера и квадродерево
// ============================================

use crate::gpu::core::ViewerResources;

/// Период вывода статистики в лог (секунды)
const STATS_INTERVAL: f32 = 5.0;

/// Система обновления
pub struct UpdateSystem;

impl UpdateSystem {
    /// Input уже обработан: двигаем камеру и перестраиваем дерево
    pub fn update(resources: &mut ViewerResources, dt: f32) {
        // 1. Камера (не ниже поверхности)
        let position = resources.camera.position;
        let ground = resources
            .renderer
            .as_ref()
            .and_then(|r| r.terrain().height_field().sample(position.x, position.z, 0.0, 1.0));
        resources.flight.update(&mut resources.camera, dt, ground);

        // 2. LOD
        resources.quadtree.update(resources.camera.position);

        // 3. Периодическая статистика
        resources.stats_timer -= dt;
        if resources.stats_timer <= 0.0 {
            resources.stats_timer = STATS_INTERVAL;
            let stats = resources.quadtree.stats();
            log::debug!(
                "Quadtree: {} nodes, {} leaves, max LOD {}, {} arena slots",
                stats.nodes,
                stats.leaves,
                stats.max_lod,
                stats.arena_slots
            );
        }
    }

    pub fn log_stats(resources: &ViewerResources) {
        let stats = resources.quadtree.stats();
        let p = resources.camera.position;
        let drawn = resources.renderer.as_ref().map_or(0, |r| r.patch_count());
        let textures = resources.renderer.as_ref().map_or(0, |r| r.gpu().textures().len());
        log::info!(
            "Camera ({:.1}, {:.1}, {:.1}) | nodes {} | leaves {} | drawn {} | max LOD {} | arena {} | textures {} | uptime {:.0}s",
            p.x,
            p.y,
            p.z,
            stats.nodes,
            stats.leaves,
            drawn,
            stats.max_lod,
            stats.arena_slots,
            textures,
            resources.start_time.elapsed().as_secs_f32()
        );
    }
}
