use super::error::Result;
use super::galaxy_builder::{build_collection, GalaxyBuilder, PointCollection};
use super::{GalaxyParameters, GalaxySet, RegenerateRequested};
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, AsyncComputeTaskPool, Task};

pub struct SpawnStarsPlugin;

impl Plugin for SpawnStarsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GalaxyBuilder>()
            .init_resource::<StarBuildTask>()
            .add_event::<GalaxyBuilt>()
            .add_systems(
                Update,
                (start_star_build, finish_star_build)
                    .chain()
                    .in_set(GalaxySet::Build),
            );
    }
}

/// Fired once a structural collection has been installed in the builder.
/// Overlay and render code key off this instead of waiting a fixed time.
#[derive(Event, Clone, Copy, Debug)]
pub struct GalaxyBuilt {
    pub generation: u64,
    pub star_count: usize,
}

/// At most one build is in flight; a newer request replaces it.
#[derive(Resource, Default)]
pub struct StarBuildTask {
    task: Option<Task<Result<PointCollection>>>,
}

impl StarBuildTask {
    pub fn in_flight(&self) -> bool {
        self.task.is_some()
    }
}

fn start_star_build(
    mut requests: EventReader<RegenerateRequested>,
    params: Res<GalaxyParameters>,
    mut builder: ResMut<GalaxyBuilder>,
    mut build: ResMut<StarBuildTask>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    if let Err(err) = params.validate() {
        error!("Galaxy not regenerated, keeping the current one: {err}");
        return;
    }

    let generation = builder.next_generation();
    let snapshot = params.clone();
    debug!(
        "Building galaxy generation {generation} ({} stars)",
        snapshot.star_count
    );

    // last writer wins: replacing the handle drops and cancels the previous build
    build.task = Some(
        AsyncComputeTaskPool::get().spawn(async move { build_collection(&snapshot, generation) }),
    );
}

fn finish_star_build(
    mut build: ResMut<StarBuildTask>,
    mut builder: ResMut<GalaxyBuilder>,
    mut built: EventWriter<GalaxyBuilt>,
) {
    let Some(task) = build.task.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    build.task = None;

    match result {
        Ok(collection) => {
            let generation = collection.generation();
            let star_count = collection.len();
            if builder.install(collection) {
                info!("Galaxy generation {generation} ready with {star_count} stars");
                built.write(GalaxyBuilt {
                    generation,
                    star_count,
                });
            } else {
                debug!("Discarded superseded galaxy generation {generation}");
            }
        }
        Err(err) => error!("Galaxy build failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::GalaxyPlugin;
    use std::time::Duration;

    fn headless_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, GalaxyPlugin));
        app
    }

    fn update_until(app: &mut App, mut done: impl FnMut(&mut App) -> bool) -> bool {
        for _ in 0..400 {
            app.update();
            if done(app) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn settled(app: &mut App) -> bool {
        !app.world().resource::<StarBuildTask>().in_flight()
            && app.world().resource::<GalaxyBuilder>().is_ready()
    }

    #[test]
    fn startup_builds_the_default_galaxy() {
        let mut app = headless_app();
        assert!(update_until(&mut app, settled));

        let expected = app.world().resource::<GalaxyParameters>().star_count as usize;
        let builder = app.world().resource::<GalaxyBuilder>();
        assert_eq!(builder.structural_len(), expected);
        assert_eq!(builder.overlay_len(), 0);
    }

    #[test]
    fn rapid_changes_settle_on_the_latest_parameters() {
        let mut app = headless_app();
        assert!(update_until(&mut app, settled));

        for count in [500, 1500, 2500] {
            app.world_mut().resource_mut::<GalaxyParameters>().star_count = count;
            app.update();
        }
        assert!(update_until(&mut app, |app| {
            settled(app) && app.world().resource::<GalaxyBuilder>().structural_len() == 2500
        }));
    }

    #[test]
    fn invalid_change_keeps_the_displayed_galaxy() {
        let mut app = headless_app();
        assert!(update_until(&mut app, settled));
        let generation = app
            .world()
            .resource::<GalaxyBuilder>()
            .structural()
            .map(PointCollection::generation);

        app.world_mut().resource_mut::<GalaxyParameters>().arms = 0;
        for _ in 0..5 {
            app.update();
        }

        assert!(!app.world().resource::<StarBuildTask>().in_flight());
        let builder = app.world().resource::<GalaxyBuilder>();
        assert_eq!(builder.structural().map(PointCollection::generation), generation);
    }

    #[test]
    fn visual_changes_do_not_rebuild() {
        let mut app = headless_app();
        assert!(update_until(&mut app, settled));
        let revision = app.world().resource::<GalaxyBuilder>().revision();

        {
            let mut params = app.world_mut().resource_mut::<GalaxyParameters>();
            params.point_size = 3.0;
            params.brightness = 1.9;
        }
        app.update();

        assert!(!app.world().resource::<StarBuildTask>().in_flight());
        assert_eq!(app.world().resource::<GalaxyBuilder>().revision(), revision);
    }
}
