use super::shader_types::StarVisualParams;
use super::{GalaxyRoot, RebuildRenderables, StarRenderable};
use crate::galaxy::{GalaxyBuilder, GalaxyParameters, GalaxySet, RenderBackend, VisualParamsChanged};
use bevy::{
    prelude::*,
    reflect::TypePath,
    render::{
        mesh::MeshTag,
        render_resource::{AsBindGroup, ShaderRef},
        storage::ShaderStorageBuffer,
    },
};

const SHADER_ASSET_PATH: &str = "shaders/star_points.wgsl";

/// Points backend: one additive billboard per point, all sharing a mesh and a
/// material so they batch into a single instanced draw.
pub struct StarInstancingPlugin;

impl Plugin for StarInstancingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<StarInstanceMaterial>::default())
            .add_systems(Startup, init_resource)
            .add_systems(
                Update,
                (spawn_star_instances, update_material)
                    .chain()
                    .in_set(GalaxySet::Display)
                    .after(super::despawn_stale_renderables),
            );
    }
}

#[derive(Resource)]
struct StarInstancingControl {
    mesh_handle: Handle<Mesh>,
    material_handle: Handle<StarInstanceMaterial>,
    colors_buffer: Handle<ShaderStorageBuffer>,
}

/// Sets up the shared billboard mesh, color buffer and material
fn init_resource(
    mut commands: Commands,
    params: Res<GalaxyParameters>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StarInstanceMaterial>>,
    mut buffers: ResMut<Assets<ShaderStorageBuffer>>,
) {
    let mesh_handle = meshes.add(Rectangle::from_size(Vec2::splat(2.0)));
    // storage bindings can't be empty
    let colors_buffer = buffers.add(ShaderStorageBuffer::from(vec![Vec4::ZERO]));

    let material_handle = materials.add(StarInstanceMaterial {
        colors: colors_buffer.clone(),
        visual: StarVisualParams::read(&params),
        alpha_mode: AlphaMode::Add,
    });

    commands.insert_resource(StarInstancingControl {
        mesh_handle,
        material_handle,
        colors_buffer,
    });
}

fn spawn_star_instances(
    mut commands: Commands,
    mut rebuilds: EventReader<RebuildRenderables>,
    builder: Res<GalaxyBuilder>,
    root: Query<Entity, With<GalaxyRoot>>,
    control: Res<StarInstancingControl>,
    mut buffers: ResMut<Assets<ShaderStorageBuffer>>,
    mut materials: ResMut<Assets<StarInstanceMaterial>>,
) {
    let Some(rebuild) = rebuilds.read().last() else {
        return;
    };
    if rebuild.backend != RenderBackend::Points || builder.is_empty() {
        return;
    }
    let Ok(root) = root.single() else {
        return;
    };

    let colors: Vec<Vec4> = builder.points().map(|star| star.color).collect();
    let Some(buffer) = buffers.get_mut(&control.colors_buffer) else {
        warn!("Star color buffer missing, skipping point rebuild");
        return;
    };
    buffer.set_data(colors);
    // touch the material so its bind group picks up the resized buffer
    if let Some(mat) = materials.get_mut(&control.material_handle) {
        mat.colors = control.colors_buffer.clone();
    }

    for (index, star) in builder.points().enumerate() {
        commands.spawn((
            // For automatic instancing to take effect every instance
            // must use the same mesh handle and material handle
            Mesh3d(control.mesh_handle.clone()),
            MeshMaterial3d(control.material_handle.clone()),
            // index into the color buffer
            MeshTag(index as u32),
            Transform::from_translation(star.position),
            StarRenderable,
            ChildOf(root),
        ));
    }
    debug!("Spawned {} star billboards", builder.len());
}

fn update_material(
    mut changes: EventReader<VisualParamsChanged>,
    params: Res<GalaxyParameters>,
    control: Res<StarInstancingControl>,
    mut materials: ResMut<Assets<StarInstanceMaterial>>,
) {
    if changes.is_empty() {
        return;
    }
    changes.clear();

    if let Some(mat) = materials.get_mut(&control.material_handle) {
        mat.visual = StarVisualParams::read(&params);
    }
}

#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
struct StarInstanceMaterial {
    #[storage(0, read_only)]
    colors: Handle<ShaderStorageBuffer>,
    #[uniform(1)]
    visual: StarVisualParams,
    alpha_mode: AlphaMode,
}

impl Material for StarInstanceMaterial {
    fn vertex_shader() -> ShaderRef {
        SHADER_ASSET_PATH.into()
    }

    fn fragment_shader() -> ShaderRef {
        SHADER_ASSET_PATH.into()
    }
    fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }
}
