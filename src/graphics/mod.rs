use crate::galaxy::{GalaxyBuilder, GalaxyParameters, GalaxySet, RenderBackend};
use bevy::prelude::*;

mod shader_types;
mod sphere_instancing;
mod star_instancing;

pub struct GraphicsPlugin;

impl Plugin for GraphicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderSync>()
            .add_event::<RebuildRenderables>()
            .add_plugins((
                star_instancing::StarInstancingPlugin,
                sphere_instancing::SphereInstancingPlugin,
            ))
            .add_systems(Startup, spawn_galaxy_root)
            .add_systems(
                Update,
                (despawn_stale_renderables.in_set(GalaxySet::Display), spin_galaxy),
            );
    }
}

/// Parent of every point renderable; the per-frame spin is applied here.
#[derive(Component, Default)]
pub struct GalaxyRoot {
    yaw: f32,
    pitch: f32,
}

/// Marks one point's renderable, whatever the backend.
#[derive(Component)]
pub struct StarRenderable;

/// Tells the active backend to spawn renderables for the builder's current points.
#[derive(Event, Clone, Copy, Debug)]
pub struct RebuildRenderables {
    pub backend: RenderBackend,
}

/// What is currently on screen, as (builder revision, backend).
#[derive(Resource, Default)]
struct RenderSync {
    displayed: Option<(u64, RenderBackend)>,
}

fn spawn_galaxy_root(mut commands: Commands) {
    commands.spawn((
        GalaxyRoot::default(),
        Transform::IDENTITY,
        Visibility::Inherited,
        Name::new("Galaxy"),
    ));

    // only the sphere backend is lit; billboards are unlit and additive
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 200.0,
        ..default()
    });
    commands.spawn((
        PointLight {
            color: Color::WHITE,
            intensity: 4.0e9,
            range: 5000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::IDENTITY,
    ));
}

/// Clears the previous renderables whenever the point set or backend changes.
fn despawn_stale_renderables(
    mut commands: Commands,
    builder: Res<GalaxyBuilder>,
    params: Res<GalaxyParameters>,
    mut sync: ResMut<RenderSync>,
    renderables: Query<Entity, With<StarRenderable>>,
    mut rebuild: EventWriter<RebuildRenderables>,
) {
    let wanted = (builder.revision(), params.backend);
    if sync.displayed == Some(wanted) {
        return;
    }

    for entity in &renderables {
        commands.entity(entity).despawn();
    }
    sync.displayed = Some(wanted);
    rebuild.write(RebuildRenderables {
        backend: params.backend,
    });
}

fn spin_galaxy(params: Res<GalaxyParameters>, mut roots: Query<(&mut Transform, &mut GalaxyRoot)>) {
    for (mut transform, mut root) in &mut roots {
        root.yaw += params.rotation_speed;
        root.pitch += params.rotation_speed / 3.0;
        transform.rotation = Quat::from_euler(EulerRot::YXZ, root.yaw, root.pitch, 0.0);
    }
}
