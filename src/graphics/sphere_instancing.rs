use super::{GalaxyRoot, RebuildRenderables, StarRenderable};
use crate::galaxy::{GalaxyBuilder, GalaxyParameters, GalaxySet, RenderBackend, VisualParamsChanged};
use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Sphere radius per unit of point size
const SPHERE_SCALE: f32 = 0.6;
/// Color quantization steps per channel; instances only batch when they share a material
const COLOR_LEVELS: f32 = 15.0;
const EMISSIVE_STRENGTH: f32 = 0.8;
/// Lowest per-sphere brightness factor; each sphere draws from `DIM_MIN..=1.0`
const DIM_MIN: f32 = 0.8;

/// Spheres backend: every point is a small lit sphere with an emissive tint.
pub struct SphereInstancingPlugin;

impl Plugin for SphereInstancingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_resource).add_systems(
            Update,
            (spawn_sphere_instances, update_spheres)
                .chain()
                .in_set(GalaxySet::Display)
                .after(super::despawn_stale_renderables),
        );
    }
}

#[derive(Resource)]
struct SphereInstancingControl {
    mesh_handle: Handle<Mesh>,
    materials: HashMap<[u8; 4], (Vec4, Handle<StandardMaterial>)>,
}

#[derive(Component)]
struct SphereInstance;

fn init_resource(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let mesh_handle = meshes.add(Sphere::new(1.0).mesh().uv(12, 12));
    commands.insert_resource(SphereInstancingControl {
        mesh_handle,
        materials: HashMap::new(),
    });
}

fn quantize(color: Vec4) -> ([u8; 4], Vec4) {
    let levels = (color.clamp(Vec4::ZERO, Vec4::ONE) * COLOR_LEVELS).round();
    let key = levels.to_array().map(|c| c as u8);
    (key, levels / COLOR_LEVELS)
}

/// Varies brightness per sphere, alpha untouched.
fn dimmed<R: Rng + ?Sized>(color: Vec4, rng: &mut R) -> Vec4 {
    let factor = rng.random_range(DIM_MIN..=1.0);
    (color.truncate() * factor).extend(color.w)
}

fn sphere_material(color: Vec4, brightness: f32) -> StandardMaterial {
    let base = Color::srgba(color.x, color.y, color.z, color.w);
    StandardMaterial {
        base_color: base,
        emissive: LinearRgba::from(base) * (EMISSIVE_STRENGTH * brightness),
        metallic: 0.3,
        perceptual_roughness: 0.5,
        ..default()
    }
}

fn sphere_transform(position: Vec3, params: &GalaxyParameters) -> Transform {
    Transform::from_translation(position).with_scale(Vec3::splat(params.point_size * SPHERE_SCALE))
}

fn spawn_sphere_instances(
    mut commands: Commands,
    mut rebuilds: EventReader<RebuildRenderables>,
    builder: Res<GalaxyBuilder>,
    params: Res<GalaxyParameters>,
    root: Query<Entity, With<GalaxyRoot>>,
    mut control: ResMut<SphereInstancingControl>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(rebuild) = rebuilds.read().last() else {
        return;
    };
    if rebuild.backend != RenderBackend::Spheres || builder.is_empty() {
        return;
    }
    let Ok(root) = root.single() else {
        return;
    };

    let control = &mut *control;
    // seeded so a respawn with the same galaxy looks the same
    let mut rng = StdRng::seed_from_u64(params.seed);
    for star in builder.points() {
        let (key, color) = quantize(dimmed(star.color, &mut rng));
        let (_, material) = control.materials.entry(key).or_insert_with(|| {
            (color, materials.add(sphere_material(color, params.brightness)))
        });

        commands.spawn((
            Mesh3d(control.mesh_handle.clone()),
            MeshMaterial3d(material.clone()),
            sphere_transform(star.position, &params),
            SphereInstance,
            StarRenderable,
            ChildOf(root),
        ));
    }
    debug!(
        "Spawned {} star spheres over {} materials",
        builder.len(),
        control.materials.len()
    );
}

/// Point size rescales the spheres in place, brightness retints the shared materials.
fn update_spheres(
    mut changes: EventReader<VisualParamsChanged>,
    params: Res<GalaxyParameters>,
    control: Res<SphereInstancingControl>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut spheres: Query<&mut Transform, With<SphereInstance>>,
) {
    if changes.is_empty() {
        return;
    }
    changes.clear();

    for (color, handle) in control.materials.values() {
        if let Some(mat) = materials.get_mut(handle) {
            *mat = sphere_material(*color, params.brightness);
        }
    }
    let scale = Vec3::splat(params.point_size * SPHERE_SCALE);
    for mut transform in &mut spheres {
        transform.scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similar_colors_share_a_material_key() {
        let (a, _) = quantize(vec4(0.85, 0.9, 1.0, 1.0));
        let (b, _) = quantize(vec4(0.86, 0.9, 0.99, 1.0));
        let (c, _) = quantize(vec4(0.5, 0.9, 1.0, 1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn quantized_color_stays_in_range() {
        let (_, color) = quantize(vec4(1.2, -0.1, 0.5, 1.0));
        assert_eq!(color.x, 1.0);
        assert_eq!(color.y, 0.0);
        assert!((color.z - 0.533_333).abs() < 1e-4);
    }

    #[test]
    fn dimming_stays_within_a_fifth_of_the_original() {
        let mut rng = StdRng::seed_from_u64(11);
        let base = vec4(0.9, 0.8, 1.0, 1.0);
        for _ in 0..500 {
            let color = dimmed(base, &mut rng);
            let factor = color.x / base.x;
            assert!((DIM_MIN - 1e-6..=1.0 + 1e-6).contains(&factor), "{factor}");
            assert!(color.truncate().abs_diff_eq(base.truncate() * factor, 1e-5));
            assert_eq!(color.w, 1.0);
        }
    }

    #[test]
    fn brightness_scales_emissive() {
        let dim = sphere_material(Vec4::ONE, 0.5);
        let bright = sphere_material(Vec4::ONE, 2.0);
        assert!(bright.emissive.red > dim.emissive.red);
        assert_eq!(dim.base_color, bright.base_color);
    }
}
