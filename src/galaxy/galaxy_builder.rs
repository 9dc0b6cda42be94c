use super::error::{GalaxyError, Result};
use super::point_generator::{point_rng, SpiralLayout, StarPoint};
use super::GalaxyParameters;
use crate::overlay::OverlayDataset;
use bevy::prelude::*;
use rayon::prelude::*;

/// The procedural point set produced by one build.
#[derive(Clone, Debug, Default)]
pub struct PointCollection {
    generation: u64,
    points: Vec<StarPoint>,
}

impl PointCollection {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[StarPoint] {
        &self.points
    }
}

/// Generates `params.star_count` points. Pure apart from the per-index RNG streams.
pub fn build_collection(params: &GalaxyParameters, generation: u64) -> Result<PointCollection> {
    let layout = SpiralLayout::new(params)?;
    let seed = params.seed;

    let points = (0..params.star_count)
        .into_par_iter()
        .map(|index| layout.place(index, None, &mut point_rng(seed, index)))
        .collect();

    Ok(PointCollection { generation, points })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayOutcome {
    pub appended: usize,
    pub skipped: usize,
}

/// Sole owner of the live point set.
///
/// Holds at most one structural collection plus the additive overlay layer.
/// Every mutation bumps `revision`, which the render adapters watch.
#[derive(Resource, Default)]
pub struct GalaxyBuilder {
    structural: Option<PointCollection>,
    overlay: Vec<StarPoint>,
    requested_generation: u64,
    revision: u64,
}

impl GalaxyBuilder {
    /// Synchronous rebuild. Invalid parameters leave the current collection in place.
    pub fn regenerate(&mut self, params: &GalaxyParameters) -> Result<&PointCollection> {
        params.validate()?;
        let generation = self.next_generation();
        self.structural = None;

        let collection = build_collection(params, generation)?;
        self.revision += 1;
        Ok(self.structural.insert(collection))
    }

    /// Reserves the generation number for a new build. Any build with an older
    /// number is stale from here on.
    pub fn next_generation(&mut self) -> u64 {
        self.requested_generation += 1;
        self.requested_generation
    }

    /// Installs a finished build if it is still the latest one requested.
    /// The previous structural collection is dropped before the new one lands.
    pub fn install(&mut self, collection: PointCollection) -> bool {
        if collection.generation != self.requested_generation {
            return false;
        }
        self.structural = Some(collection);
        self.revision += 1;
        true
    }

    pub fn append_overlay(&mut self, dataset: &OverlayDataset, scale: f32) -> Result<OverlayOutcome> {
        if self.structural.is_none() {
            return Err(GalaxyError::PreconditionViolation(
                "overlay points can only be added once a galaxy has been built",
            ));
        }

        let mut outcome = OverlayOutcome::default();
        for mapped in dataset.map_points(scale) {
            match mapped {
                Ok(point) => {
                    self.overlay.push(point);
                    outcome.appended += 1;
                }
                Err(err) => {
                    debug!("Skipping overlay record: {err}");
                    outcome.skipped += 1;
                }
            }
        }
        self.revision += 1;
        Ok(outcome)
    }

    pub fn is_ready(&self) -> bool {
        self.structural.is_some()
    }

    pub fn structural(&self) -> Option<&PointCollection> {
        self.structural.as_ref()
    }

    pub fn structural_len(&self) -> usize {
        self.structural.as_ref().map_or(0, PointCollection::len)
    }

    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }

    pub fn len(&self) -> usize {
        self.structural_len() + self.overlay_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural points first, then overlay points in file order.
    pub fn points(&self) -> impl Iterator<Item = &StarPoint> {
        self.structural
            .iter()
            .flat_map(|collection| collection.points.iter())
            .chain(self.overlay.iter())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
