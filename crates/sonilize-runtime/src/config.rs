//! [`PipelineConfig`] – start-time parameters of the sonification pipeline.
//!
//! Every field has a default, so a partial TOML table (or none at all)
//! deserializes into a usable configuration.  Values are fixed once the
//! [`Pipeline`][crate::pipeline::Pipeline] is built.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use sonilize_perception::{BlobParams, GridGeometry};
use sonilize_tracker::{AudioMapping, TrackerConfig};
use sonilize_types::SonilizeError;

/// Upper bound on `max_things`.
pub const MAX_THINGS: usize = 64;
/// Upper bound on `horiz_res * vert_res`.
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Pipeline parameters.
///
/// `max_distance` plays three roles: the furthest a cell may be and still
/// join a blob, the furthest blob distance that is reported, and the
/// distance at which a channel's volume falls to 1/16.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Horizontal grid cells.
    pub horiz_res: usize,
    /// Vertical grid cells.
    pub vert_res: usize,
    /// Horizontal field of view (radians).
    pub horiz_span: f32,
    /// Vertical field of view (radians).
    pub vert_span: f32,
    /// Maximum simultaneously tracked things, and blobs reported per frame.
    pub max_things: usize,
    /// Distance threshold in metres (see the type docs).
    pub max_distance: f32,
    /// Minimum cells in a reported blob.
    pub min_blob_size: usize,
    /// Maximum centroid displacement between frames for one thing (metres).
    pub epsilon: f32,
    /// Process only the most recent queued frame, dropping older ones.
    pub drop_stale_frames: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horiz_res: 64,
            vert_res: 64,
            horiz_span: PI,
            vert_span: PI,
            max_things: 4,
            max_distance: 1.5,
            min_blob_size: 50,
            epsilon: 0.40,
            drop_stale_frames: false,
        }
    }
}

impl PipelineConfig {
    /// Check that the parameters describe a working pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), SonilizeError> {
        nonzero("horiz_res", self.horiz_res)?;
        nonzero("vert_res", self.vert_res)?;
        nonzero("max_things", self.max_things)?;
        if self.max_things > MAX_THINGS {
            return Err(SonilizeError::InvalidConfig(format!(
                "max_things must be at most {MAX_THINGS}, got {}",
                self.max_things
            )));
        }
        match self.horiz_res.checked_mul(self.vert_res) {
            Some(cells) if cells <= MAX_GRID_CELLS => {}
            _ => {
                return Err(SonilizeError::InvalidConfig(format!(
                    "horiz_res * vert_res must be at most {MAX_GRID_CELLS} cells, got {} * {}",
                    self.horiz_res, self.vert_res
                )));
            }
        }
        positive("horiz_span", self.horiz_span)?;
        positive("vert_span", self.vert_span)?;
        positive("max_distance", self.max_distance)?;
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(SonilizeError::InvalidConfig(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(self.horiz_res, self.vert_res, self.horiz_span, self.vert_span)
    }

    pub fn blob_params(&self) -> BlobParams {
        BlobParams {
            max_cell_distance: self.max_distance,
            min_size: self.min_blob_size,
            max_blob_distance: self.max_distance,
            max_count: self.max_things,
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            epsilon: self.epsilon,
            max_things: self.max_things,
            mapping: AudioMapping::new(self.horiz_span, self.max_distance),
        }
    }
}

fn nonzero(field: &str, value: usize) -> Result<(), SonilizeError> {
    if value == 0 {
        return Err(SonilizeError::InvalidConfig(format!("{field} must be at least 1")));
    }
    Ok(())
}

fn positive(field: &str, value: f32) -> Result<(), SonilizeError> {
    if value.is_nan() || value <= 0.0 {
        return Err(SonilizeError::InvalidConfig(format!(
            "{field} must be positive, got {value}"
        )));
    }
    Ok(())
}
