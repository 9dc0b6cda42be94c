use crate::galaxy::GalaxyParameters;
use bevy::{prelude::*, render::render_resource::ShaderType};
use bytemuck::{Pod, Zeroable};

/// Billboards are `point_size * POINT_WORLD_SCALE` world units across
pub const POINT_WORLD_SCALE: f32 = 1.0;

// Duplicated in star_points.wgsl, keep both in sync
#[derive(ShaderType, Pod, Zeroable, Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct StarVisualParams {
    point_size: f32,
    brightness: f32,
    pad: Vec2,
}

impl StarVisualParams {
    pub fn read(params: &GalaxyParameters) -> Self {
        Self {
            point_size: params.point_size * POINT_WORLD_SCALE,
            brightness: params.brightness,
            pad: Vec2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_is_one_vec4() {
        assert_eq!(std::mem::size_of::<StarVisualParams>(), 16);
        let params = GalaxyParameters {
            point_size: 4.0,
            brightness: 1.5,
            ..default()
        };
        let visual = StarVisualParams::read(&params);
        let bytes = bytemuck::bytes_of(&visual);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(floats, &[4.0 * POINT_WORLD_SCALE, 1.5, 0.0, 0.0]);
    }
}
