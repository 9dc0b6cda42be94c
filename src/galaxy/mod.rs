use bevy::prelude::*;

mod error;
mod galaxy_builder;
mod galaxy_params;
mod point_generator;
mod spawn_stars;

pub use galaxy_builder::GalaxyBuilder;
pub use galaxy_params::{
    GalaxyParameters, ParamEffect, RegenerateRequested, RenderBackend, VisualParamsChanged,
    PARAM_SCHEMA,
};
pub use point_generator::StarPoint;
pub use spawn_stars::{GalaxyBuilt, StarBuildTask};

/// Frame ordering: parameter diffing, then builds, then overlay, then display sync.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GalaxySet {
    Params,
    Build,
    Overlay,
    Display,
}

/// Renderer-free core: parameters, the builder and the async build driver.
pub struct GalaxyPlugin;

impl Plugin for GalaxyPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                GalaxySet::Params,
                GalaxySet::Build,
                GalaxySet::Overlay,
                GalaxySet::Display,
            )
                .chain(),
        )
        .add_plugins((
            galaxy_params::GalaxyParamsPlugin,
            spawn_stars::SpawnStarsPlugin,
        ));
    }
}
