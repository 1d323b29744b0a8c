use bytemuck::{Pod, Zeroable};
use ultraviolet::{Mat4, Vec3};

use crate::gpu::player::Camera;
use crate::gpu::terrain::quadtree::{PatchDraw, LOD_LEVELS};
use crate::gpu::terrain::TerrainSettings;

/// Uniform кадра (group 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub scale_y: f32,
    pub light_dir: [f32; 3],
    pub scale_xz: f32,
    pub lod_ranges: [[f32; 4]; 2],
    pub morph_areas: [[f32; 4]; 2],
    pub heightmap_size: f32,
    pub morphing: u32,
    pub patch_resolution: f32,
    pub _pad: f32,
}

impl FrameUniforms {
    pub fn new(settings: &TerrainSettings, heightmap_size: u32) -> Self {
        let ranges = settings.lod_ranges.map(|r| r as f32);
        let morph = settings.lod_morph_areas();

        Self {
            view_proj: Mat4::identity().into(),
            camera_pos: [0.0; 3],
            scale_y: settings.scale_y,
            light_dir: Vec3::new(0.4, -0.8, 0.3).normalized().into(),
            scale_xz: settings.scale_xz,
            lod_ranges: split_levels(ranges),
            morph_areas: split_levels(morph),
            heightmap_size: heightmap_size as f32,
            morphing: settings.morphing as u32,
            patch_resolution: settings.patch_resolution as f32,
            _pad: 0.0,
        }
    }

    pub fn update(&mut self, camera: &Camera) {
        self.view_proj = camera.view_projection_matrix().into();
        self.camera_pos = camera.position.into();
    }
}

/// 8 уровней -> два vec4 (выравнивание uniform массивов)
fn split_levels(levels: [f32; LOD_LEVELS]) -> [[f32; 4]; 2] {
    [
        [levels[0], levels[1], levels[2], levels[3]],
        [levels[4], levels[5], levels[6], levels[7]],
    ]
}

/// Uniform одного патча (group 1, dynamic offset)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PatchUniforms {
    pub local: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub gap: f32,
    pub location: [f32; 2],
    pub lod: u32,
    pub _pad: f32,
}

impl From<&PatchDraw> for PatchUniforms {
    fn from(patch: &PatchDraw) -> Self {
        Self {
            local: patch.local.into(),
            world: patch.world.into(),
            color: patch.color.into(),
            gap: patch.gap,
            location: patch.location.into(),
            lod: patch.lod as u32,
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 176);
        assert_eq!(std::mem::size_of::<PatchUniforms>(), 160);
    }

    #[test]
    fn test_frame_uniforms_split_lod_levels() {
        let settings = TerrainSettings::default();
        let frame = FrameUniforms::new(&settings, 256);
        assert_eq!(frame.lod_ranges[0][0], settings.lod_ranges[0] as f32);
        assert_eq!(frame.lod_ranges[1][3], settings.lod_ranges[7] as f32);
        assert_eq!(frame.morph_areas[0][1], settings.lod_morph_areas()[1]);
        assert_eq!(frame.morphing, 1);
    }
}
