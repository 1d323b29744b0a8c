// ============================================
// Terrain Quadtree - Адаптивный LOD по дистанции
// ============================================
//
// Все узлы в одном Vec (как LinearOctree), блоки по 4 ребёнка.
// Освобождённые блоки возвращаются в free list и переиспользуются.
// Форма дерева меняется только в update(); render() только читает.

mod node;

pub use node::{NodeId, QuadtreeNode, TerrainScale, Transform, INVALID_INDEX, LOD_LEVELS, MAX_LOD};

use ultraviolet::{Mat4, Vec2, Vec3};

use crate::gpu::terrain::config::TerrainSettings;

/// Режим отрисовки патчей
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Filled,
    Wireframe,
}

/// Всё, что нужно рендереру для одного листа
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchDraw {
    pub local: Mat4,
    pub world: Mat4,
    pub color: Vec3,
    pub lod: u8,
    pub gap: f32,
    pub location: Vec2,
}

/// Получатель патчей (рендерер или тестовый сборщик)
pub trait PatchSink {
    fn draw_patch(&mut self, patch: &PatchDraw);
}

impl PatchSink for Vec<PatchDraw> {
    fn draw_patch(&mut self, patch: &PatchDraw) {
        self.push(*patch);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuadtreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_lod: u8,
    /// Размер арены, включая свободные слоты
    pub arena_slots: usize,
}

pub struct Quadtree {
    nodes: Vec<QuadtreeNode>,
    /// Первые индексы свободных блоков по 4 узла
    free_blocks: Vec<u32>,
    roots: Vec<u32>,
    scale: TerrainScale,
    lod_ranges: [f32; LOD_LEVELS],
    hysteresis: f32,
    render_mode: RenderMode,
}

impl Quadtree {
    /// rootNodes² корней, все листья
    pub fn new(settings: &TerrainSettings) -> Self {
        let scale = TerrainScale {
            root_nodes: settings.root_nodes.max(1),
            scale_xz: settings.scale_xz,
            scale_y: settings.scale_y,
        };
        let r = scale.root_nodes;

        let mut nodes = Vec::with_capacity((r * r) as usize * 4);
        let mut roots = Vec::with_capacity((r * r) as usize);
        for i in 0..r {
            for j in 0..r {
                let location = Vec2::new(i as f32 / r as f32, j as f32 / r as f32);
                roots.push(nodes.len() as u32);
                nodes.push(QuadtreeNode::new(0, location, [i, j], INVALID_INDEX, &scale));
            }
        }

        log::info!("Quadtree: {} root nodes, patch size {}", roots.len(), scale.scale_xz / r as f32);

        Self {
            nodes,
            free_blocks: Vec::new(),
            roots,
            scale,
            lod_ranges: settings.lod_ranges.map(|d| d as f32),
            hysteresis: settings.lod_hysteresis.max(0.0),
            render_mode: RenderMode::default(),
        }
    }

    pub fn scale(&self) -> &TerrainScale {
        &self.scale
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().map(|&i| NodeId(i))
    }

    pub fn node(&self, id: NodeId) -> Option<&QuadtreeNode> {
        self.nodes.get(id.index())
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn toggle_wireframe(&mut self) -> RenderMode {
        self.render_mode = match self.render_mode {
            RenderMode::Filled => RenderMode::Wireframe,
            RenderMode::Wireframe => RenderMode::Filled,
        };
        self.render_mode
    }

    /// Дистанция разбиения для уровня
    #[inline]
    pub fn lod_range(&self, lod: u8) -> f32 {
        debug_assert!((lod as usize) < LOD_LEVELS, "LOD {} out of range", lod);
        self.lod_ranges[(lod as usize).min(LOD_LEVELS - 1)]
    }

    // ============================================
    // Update
    // ============================================

    /// Перестроить дерево под позицию камеры
    pub fn update(&mut self, camera: Vec3) {
        for r in 0..self.roots.len() {
            let root = self.roots[r];
            self.update_node(root, camera);
        }
    }

    fn update_node(&mut self, idx: u32, camera: Vec3) {
        let scale_y = self.scale.scale_y;
        let node = &mut self.nodes[idx as usize];
        node.follow_camera_height(camera.y, scale_y);

        let distance = node.distance_to(camera);
        let lod = node.lod;
        let leaf = node.is_leaf();
        let range = self.lod_range(lod);

        if leaf {
            if distance < range && lod < MAX_LOD {
                self.subdivide(idx);
            }
        } else if distance >= range + self.hysteresis {
            self.merge(idx);
        }

        let first = self.nodes[idx as usize].first_child;
        if first != INVALID_INDEX {
            for c in first..first + 4 {
                self.update_node(c, camera);
            }
        }
    }

    fn subdivide(&mut self, idx: u32) {
        let parent = self.nodes[idx as usize].clone();
        let lod = parent.lod + 1;

        let mut children = Vec::with_capacity(4);
        for i in 0..2 {
            for j in 0..2 {
                children.push(QuadtreeNode::new(
                    lod,
                    parent.child_location(i, j),
                    [i, j],
                    idx,
                    &self.scale,
                ));
            }
        }

        let first = self.alloc_block(children);
        self.nodes[idx as usize].first_child = first;
    }

    /// Освободить всех потомков, узел снова лист
    fn merge(&mut self, idx: u32) {
        let first = self.nodes[idx as usize].first_child;
        if first != INVALID_INDEX {
            self.free_block(first);
            self.nodes[idx as usize].first_child = INVALID_INDEX;
        }
    }

    fn alloc_block(&mut self, children: Vec<QuadtreeNode>) -> u32 {
        debug_assert_eq!(children.len(), 4);
        match self.free_blocks.pop() {
            Some(first) => {
                for (offset, child) in children.into_iter().enumerate() {
                    self.nodes[first as usize + offset] = child;
                }
                first
            }
            None => {
                let first = self.nodes.len() as u32;
                self.nodes.extend(children);
                first
            }
        }
    }

    fn free_block(&mut self, first: u32) {
        for c in first..first + 4 {
            let grandchild = self.nodes[c as usize].first_child;
            if grandchild != INVALID_INDEX {
                self.free_block(grandchild);
                self.nodes[c as usize].first_child = INVALID_INDEX;
            }
        }
        self.free_blocks.push(first);
    }

    // ============================================
    // Render
    // ============================================

    /// Отдать каждый лист получателю
    pub fn render(&self, sink: &mut impl PatchSink) {
        for leaf in self.leaves() {
            let node = &self.nodes[leaf.index()];
            sink.draw_patch(&PatchDraw {
                local: node.local.matrix(),
                world: node.world.matrix(),
                color: node.color,
                lod: node.lod,
                gap: node.gap,
                location: node.location,
            });
        }
    }

    /// Обход листьев в глубину
    pub fn leaves(&self) -> Leaves<'_> {
        let mut stack: Vec<u32> = self.roots.clone();
        stack.reverse();
        Leaves { tree: self, stack }
    }

    // ============================================
    // Навигация и статистика
    // ============================================

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent())
    }

    pub fn children(&self, id: NodeId) -> Option<[NodeId; 4]> {
        self.node(id).and_then(|n| n.children())
    }

    /// Предки от родителя к корню
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Живые узлы (достижимые от корней)
    pub fn count_nodes(&self) -> usize {
        self.stats().nodes
    }

    pub fn count_leaves(&self) -> usize {
        self.leaves().count()
    }

    pub fn stats(&self) -> QuadtreeStats {
        let mut stats = QuadtreeStats {
            arena_slots: self.nodes.len(),
            ..Default::default()
        };

        let mut stack: Vec<u32> = self.roots.clone();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            stats.nodes += 1;
            stats.max_lod = stats.max_lod.max(node.lod);
            if node.is_leaf() {
                stats.leaves += 1;
            } else {
                stack.extend(node.first_child..node.first_child + 4);
            }
        }
        stats
    }
}

/// Итератор по листьям
pub struct Leaves<'a> {
    tree: &'a Quadtree,
    stack: Vec<u32>,
}

impl Iterator for Leaves<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(idx) = self.stack.pop() {
            let node = &self.tree.nodes[idx as usize];
            if node.is_leaf() {
                return Some(NodeId(idx));
            }
            let first = node.first_child;
            self.stack.extend((first..first + 4).rev());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(root_nodes: u32, lod_ranges: [u32; LOD_LEVELS]) -> TerrainSettings {
        TerrainSettings {
            root_nodes,
            scale_xz: 1024.0,
            scale_y: 100.0,
            lod_ranges,
            ..Default::default()
        }
    }

    /// Дистанции, убывающие вдвое с каждым уровнем
    fn geometric_ranges(base: u32) -> [u32; LOD_LEVELS] {
        std::array::from_fn(|i| base >> i)
    }

    /// Проверка инвариантов формы дерева
    fn assert_consistent(tree: &Quadtree) {
        let mut stack: Vec<u32> = tree.roots.clone();
        while let Some(idx) = stack.pop() {
            let node = &tree.nodes[idx as usize];
            let expected_gap = 1.0 / (tree.scale.root_nodes as f32 * (1u32 << node.lod) as f32);
            assert_eq!(node.gap, expected_gap);

            if let Some(children) = node.children() {
                for (k, child_id) in children.iter().enumerate() {
                    let child = tree.node(*child_id).unwrap();
                    let (i, j) = ((k / 2) as u32, (k % 2) as u32);
                    assert_eq!(child.lod, node.lod + 1);
                    assert_eq!(child.parent(), Some(NodeId(idx)));
                    assert_eq!(child.index, [i, j]);
                    assert_eq!(
                        child.location,
                        node.location + Vec2::new(i as f32 * node.gap / 2.0, j as f32 * node.gap / 2.0)
                    );
                    stack.push(child_id.0);
                }
            }
        }
    }

    #[test]
    fn test_roots_cover_unit_square() {
        let tree = Quadtree::new(&settings(4, [0; LOD_LEVELS]));
        assert_eq!(tree.count_nodes(), 16);
        assert_eq!(tree.count_leaves(), 16);

        let locations: Vec<Vec2> = tree.roots().map(|id| tree.node(id).unwrap().location).collect();
        assert!(locations.contains(&Vec2::new(0.0, 0.0)));
        assert!(locations.contains(&Vec2::new(0.75, 0.75)));
        assert!(locations.contains(&Vec2::new(0.25, 0.5)));
    }

    #[test]
    fn test_gap_matches_lod_for_various_root_counts() {
        for root_nodes in [1, 4, 12] {
            let mut tree = Quadtree::new(&settings(root_nodes, geometric_ranges(2048)));
            tree.update(Vec3::new(0.0, 0.0, 0.0));
            assert_consistent(&tree);

            for leaf in tree.leaves() {
                let node = tree.node(leaf).unwrap();
                let expected = 1.0 / (root_nodes as f32 * 2f32.powi(node.lod as i32));
                assert_eq!(node.gap, expected);
            }
            assert!(tree.stats().max_lod > 0);
        }
    }

    #[test]
    fn test_full_subdivision_stops_at_max_lod() {
        let mut tree = Quadtree::new(&settings(1, [u32::MAX; LOD_LEVELS]));
        tree.update(Vec3::new(0.0, 50.0, 0.0));

        let stats = tree.stats();
        // 1 + 4 + ... + 4^7
        assert_eq!(stats.nodes, 21845);
        assert_eq!(stats.leaves, 16384);
        assert_eq!(stats.max_lod, MAX_LOD);
        assert!(tree.leaves().all(|id| tree.node(id).unwrap().lod == MAX_LOD));
    }

    #[test]
    fn test_zero_ranges_keep_roots() {
        let mut tree = Quadtree::new(&settings(3, [0; LOD_LEVELS]));
        tree.update(Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(tree.count_nodes(), 9);
    }

    #[test]
    fn test_far_camera_merges_back_to_roots() {
        let mut tree = Quadtree::new(&settings(2, geometric_ranges(1024)));
        tree.update(Vec3::new(10.0, 5.0, -20.0));
        assert!(tree.count_nodes() > 4);

        tree.update(Vec3::new(100_000.0, 5.0, 100_000.0));
        assert_eq!(tree.count_nodes(), 4);
        assert_eq!(tree.count_leaves(), 4);
    }

    #[test]
    fn test_freed_blocks_are_reused() {
        let mut tree = Quadtree::new(&settings(1, geometric_ranges(1024)));
        let near = Vec3::new(1.0, 0.0, 1.0);
        let far = Vec3::new(50_000.0, 0.0, 50_000.0);

        tree.update(near);
        let slots = tree.stats().arena_slots;
        let nodes = tree.count_nodes();

        tree.update(far);
        tree.update(near);
        assert_eq!(tree.stats().arena_slots, slots);
        assert_eq!(tree.count_nodes(), nodes);
    }

    #[test]
    fn test_render_emits_only_leaves() {
        let mut tree = Quadtree::new(&settings(2, geometric_ranges(1024)));
        tree.update(Vec3::new(-300.0, 20.0, 100.0));

        let mut patches: Vec<PatchDraw> = Vec::new();
        tree.render(&mut patches);

        assert_eq!(patches.len(), tree.count_leaves());
        assert!(patches.len() < tree.count_nodes());
        for (patch, leaf) in patches.iter().zip(tree.leaves()) {
            let node = tree.node(leaf).unwrap();
            assert_eq!(patch.lod, node.lod);
            assert_eq!(patch.location, node.location);
            assert_eq!(patch.color, node.color);
            assert_eq!(patch.local, node.local.matrix());
        }
    }

    #[test]
    fn test_center_height_follows_camera() {
        let mut tree = Quadtree::new(&settings(1, [0; LOD_LEVELS]));
        tree.update(Vec3::new(0.0, 5000.0, 0.0));
        let root = tree.roots().next().unwrap();
        assert_eq!(tree.node(root).unwrap().center.y, 100.0);

        tree.update(Vec3::new(0.0, 30.0, 0.0));
        assert_eq!(tree.node(root).unwrap().center.y, 30.0);
    }

    #[test]
    fn test_hysteresis_delays_merge() {
        let mut s = settings(1, [600, 0, 0, 0, 0, 0, 0, 0]);
        s.lod_hysteresis = 50.0;
        let mut tree = Quadtree::new(&s);

        tree.update(Vec3::new(0.0, 0.0, 590.0));
        assert_eq!(tree.count_nodes(), 5);

        // За границей range, но внутри полосы гистерезиса
        tree.update(Vec3::new(0.0, 0.0, 620.0));
        assert_eq!(tree.count_nodes(), 5);

        tree.update(Vec3::new(0.0, 0.0, 660.0));
        assert_eq!(tree.count_nodes(), 1);
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let mut tree = Quadtree::new(&settings(1, [u32::MAX, u32::MAX, u32::MAX, 0, 0, 0, 0, 0]));
        tree.update(Vec3::zero());

        let leaf = tree.leaves().next().unwrap();
        assert_eq!(tree.node(leaf).unwrap().lod, 3);

        let chain: Vec<u8> = tree.ancestors(leaf).map(|id| tree.node(id).unwrap().lod).collect();
        assert_eq!(chain, vec![2, 1, 0]);
        assert!(tree.node(*tree.ancestors(leaf).collect::<Vec<_>>().last().unwrap()).unwrap().is_root());
    }

    #[test]
    fn test_toggle_wireframe() {
        let mut tree = Quadtree::new(&settings(1, [0; LOD_LEVELS]));
        assert_eq!(tree.render_mode(), RenderMode::Filled);
        assert_eq!(tree.toggle_wireframe(), RenderMode::Wireframe);
        assert_eq!(tree.toggle_wireframe(), RenderMode::Filled);
        tree.set_render_mode(RenderMode::Wireframe);
        assert_eq!(tree.render_mode(), RenderMode::Wireframe);
    }

    proptest! {
        #[test]
        fn prop_leaves_and_internal_nodes_match_ranges(
            path in prop::collection::vec((-800.0f32..800.0, -50.0f32..300.0, -800.0f32..800.0), 1..12),
            root_nodes in 1u32..5,
        ) {
            let mut tree = Quadtree::new(&settings(root_nodes, geometric_ranges(1200)));

            for (x, y, z) in path {
                let camera = Vec3::new(x, y, z);
                tree.update(camera);
                assert_consistent(&tree);

                let mut stack: Vec<u32> = tree.roots.clone();
                while let Some(idx) = stack.pop() {
                    let node = &tree.nodes[idx as usize];
                    let distance = node.distance_to(camera);
                    let range = tree.lod_range(node.lod);
                    if node.is_leaf() {
                        prop_assert!(node.lod == MAX_LOD || distance >= range);
                    } else {
                        prop_assert!(distance < range);
                        stack.extend(node.first_child..node.first_child + 4);
                    }
                }
                prop_assert!(tree.count_leaves() >= tree.roots.len());
            }
        }
    }
}
