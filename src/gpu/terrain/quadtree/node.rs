// ============================================
// Quadtree Node - Один патч террейна
// ============================================
// Узлы живут в арене Quadtree и ссылаются друг на друга через u32.
// 4 ребёнка всегда лежат подряд: first_child..first_child+4.

use ultraviolet::{Mat4, Vec2, Vec3, Vec4};

/// Невалидный индекс (аналог null)
pub const INVALID_INDEX: u32 = u32::MAX;

/// Максимальная глубина LOD (0 = самый грубый)
pub const MAX_LOD: u8 = 7;

/// Количество уровней LOD
pub const LOD_LEVELS: usize = MAX_LOD as usize + 1;

/// Цвета уровней для отладочной отрисовки
const LOD_COLORS: [[f32; 3]; LOD_LEVELS] = [
    [0.85, 0.20, 0.20],
    [0.90, 0.55, 0.15],
    [0.90, 0.85, 0.20],
    [0.35, 0.80, 0.25],
    [0.20, 0.75, 0.75],
    [0.25, 0.45, 0.90],
    [0.55, 0.30, 0.85],
    [0.90, 0.90, 0.90],
];

/// Идентификатор узла в арене
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Перенос + масштаб (без вращения)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// translate * scale
    pub fn matrix(&self) -> Mat4 {
        let s = self.scale;
        let t = self.translation;
        Mat4::new(
            Vec4::new(s.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z, 0.0),
            Vec4::new(t.x, t.y, t.z, 1.0),
        )
    }

    pub fn apply(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.translation
    }
}

/// Общие для всех узлов масштабы террейна
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainScale {
    pub root_nodes: u32,
    pub scale_xz: f32,
    pub scale_y: f32,
}

impl TerrainScale {
    /// Размер патча уровня `lod` в единичном пространстве
    #[inline]
    pub fn gap(&self, lod: u8) -> f32 {
        1.0 / (self.root_nodes as f32 * (1u32 << lod) as f32)
    }

    /// Единичное пространство -> мир
    pub fn world_transform(&self) -> Transform {
        let half = self.scale_xz * 0.5;
        Transform {
            translation: Vec3::new(-half, 0.0, -half),
            scale: Vec3::new(self.scale_xz, self.scale_y, self.scale_xz),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuadtreeNode {
    pub lod: u8,
    /// Левый верхний угол в единичном пространстве
    pub location: Vec2,
    /// Позиция (i, j) среди соседей
    pub index: [u32; 2],
    /// Центр в мире; y обновляется каждый кадр от камеры
    pub center: Vec3,
    pub gap: f32,
    pub local: Transform,
    pub world: Transform,
    pub color: Vec3,
    pub(crate) first_child: u32,
    pub(crate) parent: u32,
}

impl QuadtreeNode {
    pub fn new(lod: u8, location: Vec2, index: [u32; 2], parent: u32, scale: &TerrainScale) -> Self {
        let gap = scale.gap(lod);
        let half = scale.scale_xz * 0.5;
        let center = Vec3::new(
            (location.x + gap * 0.5) * scale.scale_xz - half,
            0.0,
            (location.y + gap * 0.5) * scale.scale_xz - half,
        );
        let [r, g, b] = LOD_COLORS[(lod as usize).min(LOD_LEVELS - 1)];

        Self {
            lod,
            location,
            index,
            center,
            gap,
            local: Transform {
                translation: Vec3::new(location.x, 0.0, location.y),
                scale: Vec3::new(gap, 0.0, gap),
            },
            world: scale.world_transform(),
            color: Vec3::new(r, g, b),
            first_child: INVALID_INDEX,
            parent,
        }
    }

    /// Отладочное имя вида "lod2[1,0]"
    pub fn name(&self) -> String {
        format!("lod{}[{},{}]", self.lod, self.index[0], self.index[1])
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.first_child == INVALID_INDEX
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent == INVALID_INDEX
    }

    pub fn parent(&self) -> Option<NodeId> {
        (self.parent != INVALID_INDEX).then_some(NodeId(self.parent))
    }

    /// 4 ребёнка в порядке (0,0), (0,1), (1,0), (1,1)
    pub fn children(&self) -> Option<[NodeId; 4]> {
        if self.is_leaf() {
            return None;
        }
        let f = self.first_child;
        Some([NodeId(f), NodeId(f + 1), NodeId(f + 2), NodeId(f + 3)])
    }

    /// Высота центра следует за камерой, но не выше вершины террейна
    #[inline]
    pub fn follow_camera_height(&mut self, camera_y: f32, scale_y: f32) {
        self.center.y = if camera_y > scale_y { scale_y } else { camera_y };
    }

    #[inline]
    pub fn distance_to(&self, camera: Vec3) -> f32 {
        (camera - self.center).mag()
    }

    /// Расположение ребёнка (i, j)
    pub fn child_location(&self, i: u32, j: u32) -> Vec2 {
        let half = self.gap * 0.5;
        self.location + Vec2::new(i as f32 * half, j as f32 * half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(root_nodes: u32) -> TerrainScale {
        TerrainScale {
            root_nodes,
            scale_xz: 1024.0,
            scale_y: 100.0,
        }
    }

    #[test]
    fn test_gap_halves_per_level() {
        let s = scale(4);
        assert_eq!(s.gap(0), 0.25);
        assert_eq!(s.gap(1), 0.125);
        assert_eq!(s.gap(7), 1.0 / 512.0);
    }

    #[test]
    fn test_center_of_root() {
        let node = QuadtreeNode::new(0, Vec2::new(0.25, 0.5), [1, 2], INVALID_INDEX, &scale(4));
        // (0.25 + 0.125) * 1024 - 512 = -128; (0.5 + 0.125) * 1024 - 512 = 128
        assert_eq!(node.center, Vec3::new(-128.0, 0.0, 128.0));
        assert!(node.is_root());
        assert!(node.is_leaf());
        assert_eq!(node.name(), "lod0[1,2]");
    }

    #[test]
    fn test_transforms_map_patch_to_world() {
        let node = QuadtreeNode::new(1, Vec2::new(0.5, 0.0), [1, 0], 0, &scale(1));
        let unit = node.local.apply(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(unit, Vec3::new(1.0, 0.0, 0.5));

        let world = node.world.apply(Vec3::new(unit.x, 1.0, unit.z));
        assert_eq!(world, Vec3::new(512.0, 100.0, 0.0));

        let m = node.world.matrix() * node.local.matrix();
        let p = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(p, Vec4::new(0.0, 0.0, -512.0, 1.0));
    }

    #[test]
    fn test_center_height_clamps_to_terrain_top() {
        let mut node = QuadtreeNode::new(0, Vec2::zero(), [0, 0], INVALID_INDEX, &scale(1));
        node.follow_camera_height(1000.0, 100.0);
        assert_eq!(node.center.y, 100.0);
        node.follow_camera_height(42.0, 100.0);
        assert_eq!(node.center.y, 42.0);
        node.follow_camera_height(-5.0, 100.0);
        assert_eq!(node.center.y, -5.0);
    }

    #[test]
    fn test_child_locations() {
        let node = QuadtreeNode::new(0, Vec2::new(0.5, 0.5), [1, 1], INVALID_INDEX, &scale(2));
        assert_eq!(node.child_location(0, 0), Vec2::new(0.5, 0.5));
        assert_eq!(node.child_location(1, 0), Vec2::new(0.75, 0.5));
        assert_eq!(node.child_location(0, 1), Vec2::new(0.5, 0.75));
        assert_eq!(node.child_location(1, 1), Vec2::new(0.75, 0.75));
    }
}
