//! Synthetic sensor – one object sweeping across the field of view.
//!
//! The object is a square patch of surface, roughly ten grid cells wide,
//! that travels from the right edge (`theta = -1.2`) to the left edge
//! (`theta = +1.2`) while bobbing between 0.5 m and 1.1 m away.  Points are
//! spaced half a cell apart so every covered cell receives samples.

use std::f32::consts::{PI, TAU};

use sonilize_perception::Point3;
use sonilize_runtime::{PipelineConfig, PointCloudFrame};

const THETA_START: f32 = -1.2;
const THETA_END: f32 = 1.2;
const PHI: f32 = 0.05;
const MEAN_DISTANCE: f32 = 0.8;
const BOB: f32 = 0.3;
/// Patch width in grid cells.
const CELLS_ACROSS: f32 = 10.0;

/// Generates the frames of one sweep.
#[derive(Debug, Clone, Copy)]
pub struct Sweep {
    frames: usize,
    cell_h: f32,
    cell_v: f32,
}

impl Sweep {
    pub fn new(frames: usize, pipeline: &PipelineConfig) -> Self {
        Self {
            frames: frames.max(1),
            cell_h: pipeline.horiz_span / pipeline.horiz_res as f32,
            cell_v: pipeline.vert_span / pipeline.vert_res as f32,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Object position `(r, theta)` in frame `i`.
    pub fn position(&self, i: usize) -> (f32, f32) {
        let progress = if self.frames == 1 {
            0.0
        } else {
            i as f32 / (self.frames - 1) as f32
        };
        let theta = THETA_START + (THETA_END - THETA_START) * progress;
        let r = MEAN_DISTANCE + BOB * (TAU * progress).sin();
        (r, theta)
    }

    /// Points of frame `i`.
    pub fn points(&self, i: usize) -> Vec<Point3> {
        let (r, theta) = self.position(i);
        let n = (2.0 * CELLS_ACROSS) as usize;
        let half = (n as f32 - 1.0) / 2.0;
        let mut points = Vec::with_capacity(n * n);
        for a in 0..n {
            let t = theta + (a as f32 - half) * self.cell_h / 2.0;
            if t.abs() >= PI / 2.0 {
                continue;
            }
            for b in 0..n {
                let p = PHI + (b as f32 - half) * self.cell_v / 2.0;
                points.push(Point3::new(
                    r * p.cos() * t.sin(),
                    -r * p.sin(),
                    r * p.cos() * t.cos(),
                ));
            }
        }
        points
    }

    pub fn frame(&self, i: usize) -> PointCloudFrame {
        PointCloudFrame::new(self.points(i))
    }
}
