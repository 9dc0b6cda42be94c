use crate::galaxy::{GalaxyBuilder, GalaxySet};
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, IoTaskPool, Task};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) mod dataset;

pub use dataset::{load_overlay, OverlayDataset, OverlayError};

#[derive(Resource, Clone, Debug)]
pub struct OverlaySettings {
    pub path: PathBuf,
    /// Raw `pos` values are small, they get multiplied by this on ingestion
    pub scale: f32,
    pub timeout: Duration,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/universe.json"),
            scale: 3000.0,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub enum OverlayStatus {
    #[default]
    NotStarted,
    Loading,
    /// Parsed, held back until the structural galaxy exists
    WaitingForGalaxy,
    Applied {
        appended: usize,
        skipped: usize,
    },
    /// Load failed; only the procedural galaxy is shown
    Absent(String),
}

#[derive(Resource, Default)]
struct OverlayLoadTask {
    task: Option<Task<Result<OverlayDataset, OverlayError>>>,
    started: Duration,
}

#[derive(Resource, Default)]
struct PendingOverlay(Option<OverlayDataset>);

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlaySettings>()
            .init_resource::<OverlayStatus>()
            .init_resource::<OverlayLoadTask>()
            .init_resource::<PendingOverlay>()
            .add_systems(Startup, start_overlay_load)
            .add_systems(
                Update,
                (poll_overlay_load, apply_pending_overlay)
                    .chain()
                    .in_set(GalaxySet::Overlay),
            );
    }
}

fn start_overlay_load(
    settings: Res<OverlaySettings>,
    time: Res<Time<Real>>,
    mut load: ResMut<OverlayLoadTask>,
    mut status: ResMut<OverlayStatus>,
) {
    let path = settings.path.clone();
    info!("Loading overlay data from {}", path.display());

    load.task = Some(IoTaskPool::get().spawn(async move { load_overlay(path) }));
    load.started = time.elapsed();
    *status = OverlayStatus::Loading;
}

fn poll_overlay_load(
    settings: Res<OverlaySettings>,
    time: Res<Time<Real>>,
    mut load: ResMut<OverlayLoadTask>,
    mut pending: ResMut<PendingOverlay>,
    mut status: ResMut<OverlayStatus>,
) {
    let started = load.started;
    let Some(task) = load.task.as_mut() else {
        return;
    };

    let result = match block_on(future::poll_once(task)) {
        Some(result) => result,
        None if time.elapsed().saturating_sub(started) > settings.timeout => {
            Err(OverlayError::TimedOut(settings.timeout))
        }
        None => return,
    };
    // dropping an unfinished task cancels it
    load.task = None;

    match result {
        Ok(dataset) => {
            let meta = dataset.meta().cloned().unwrap_or_default();
            let declared = |n: Option<u64>| n.map_or("?".to_string(), |n| n.to_string());
            info!(
                "Overlay data loaded: {} records ({} declared, {} clusters)",
                dataset.len(),
                declared(meta.total_points),
                declared(meta.num_clusters),
            );
            if let Some(total) = meta.total_points.filter(|&n| n != dataset.len() as u64) {
                warn!("Overlay meta declares {total} points but the file holds {}", dataset.len());
            }
            pending.0 = Some(dataset);
            *status = OverlayStatus::WaitingForGalaxy;
        }
        Err(err) => {
            warn!("No overlay data, showing the procedural galaxy only: {err}");
            *status = OverlayStatus::Absent(err.to_string());
        }
    }
}

/// Adds the overlay once the builder holds a structural collection.
fn apply_pending_overlay(
    settings: Res<OverlaySettings>,
    mut builder: ResMut<GalaxyBuilder>,
    mut pending: ResMut<PendingOverlay>,
    mut status: ResMut<OverlayStatus>,
) {
    if pending.0.is_none() || !builder.is_ready() {
        return;
    }
    let Some(dataset) = pending.0.take() else {
        return;
    };

    match builder.append_overlay(&dataset, settings.scale) {
        Ok(outcome) => {
            if outcome.skipped > 0 {
                warn!("Skipped {} malformed overlay records", outcome.skipped);
            }
            info!("Added {} overlay points to the galaxy", outcome.appended);
            *status = OverlayStatus::Applied {
                appended: outcome.appended,
                skipped: outcome.skipped,
            };
        }
        Err(err) => {
            warn!("Overlay deferred: {err}");
            pending.0 = Some(dataset);
        }
    }
}
