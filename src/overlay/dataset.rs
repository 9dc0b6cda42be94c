use crate::galaxy::StarPoint;
use bevy::prelude::*;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const OVERLAY_PALETTE: [Vec3; 7] = [
    Vec3::new(0.9, 0.9, 1.0),
    Vec3::new(1.0, 0.85, 0.85),
    Vec3::new(0.85, 1.0, 0.9),
    Vec3::new(0.95, 0.95, 1.0),
    Vec3::new(1.0, 0.9, 0.7),
    Vec3::new(0.7, 0.9, 1.0),
    Vec3::new(0.8, 0.8, 0.8),
];

/// Color for records that carry no cluster id
pub const UNCLUSTERED_COLOR: Vec3 = Vec3::ONE;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("could not read overlay file: {0}")]
    Io(#[from] std::io::Error),

    #[error("overlay file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("overlay load did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OverlayMeta {
    #[serde(default)]
    pub total_points: Option<u64>,
    #[serde(default)]
    pub num_clusters: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OverlayRecord {
    #[serde(default)]
    pub pos: Option<Vec<f32>>,
    /// Non-integer ids (floats, strings) leave the record unclustered
    #[serde(default, deserialize_with = "lenient_cluster")]
    pub cluster: Option<i64>,
}

fn lenient_cluster<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_i64())
}

#[derive(Deserialize)]
struct OverlayDocument {
    #[serde(default)]
    meta: Option<OverlayMeta>,
    points: Vec<serde_json::Value>,
}

#[derive(Clone, Debug)]
enum OverlayEntry {
    Record(OverlayRecord),
    Malformed(String),
}

/// Overlay points as read from disk. Records are validated lazily when mapped,
/// so one bad record never invalidates the rest.
#[derive(Clone, Debug, Default)]
pub struct OverlayDataset {
    meta: Option<OverlayMeta>,
    entries: Vec<OverlayEntry>,
}

pub fn parse_overlay(json: &str) -> Result<OverlayDataset, OverlayError> {
    let document: OverlayDocument = serde_json::from_str(json)?;
    let entries = document
        .points
        .into_iter()
        .map(|value| match serde_json::from_value::<OverlayRecord>(value) {
            Ok(record) => OverlayEntry::Record(record),
            Err(err) => OverlayEntry::Malformed(err.to_string()),
        })
        .collect();

    Ok(OverlayDataset {
        meta: document.meta,
        entries,
    })
}

pub fn load_overlay(path: impl AsRef<Path>) -> Result<OverlayDataset, OverlayError> {
    let json = std::fs::read_to_string(path)?;
    parse_overlay(&json)
}

pub fn overlay_color(cluster: Option<i64>) -> Vec4 {
    let base = match cluster {
        Some(id) => OVERLAY_PALETTE[id.rem_euclid(OVERLAY_PALETTE.len() as i64) as usize],
        None => UNCLUSTERED_COLOR,
    };
    base.extend(1.0)
}

impl OverlayRecord {
    pub fn to_point(&self, index: usize, scale: f32) -> Result<StarPoint, OverlayError> {
        let pos = match self.pos.as_deref() {
            Some(pos) if pos.len() >= 3 => pos,
            Some(pos) => {
                return Err(OverlayError::MalformedRecord {
                    index,
                    reason: format!("`pos` has {} components, expected 3", pos.len()),
                })
            }
            None => {
                return Err(OverlayError::MalformedRecord {
                    index,
                    reason: "missing `pos`".to_string(),
                })
            }
        };

        Ok(StarPoint {
            position: vec3(pos[0], pos[1], pos[2]) * scale,
            color: overlay_color(self.cluster),
            cluster: self.cluster,
        })
    }
}

impl OverlayDataset {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn meta(&self) -> Option<&OverlayMeta> {
        self.meta.as_ref()
    }

    pub fn map_points(&self, scale: f32) -> impl Iterator<Item = Result<StarPoint, OverlayError>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(index, entry)| match entry {
                OverlayEntry::Record(record) => record.to_point(index, scale),
                OverlayEntry::Malformed(reason) => Err(OverlayError::MalformedRecord {
                    index,
                    reason: reason.clone(),
                }),
            })
    }
}
