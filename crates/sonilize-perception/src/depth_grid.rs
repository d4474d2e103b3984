//! Depth Grid Quantizer.
//!
//! Buckets every point of a frame into a fixed `horiz_res × vert_res` grid
//! of angular cells.  Each cell covers an equal sub-span of the configured
//! field of view and holds the generalized mean of the radial distances of
//! the points that fall into it.  Cells that received no points hold
//! `+inf`, i.e. "nothing there", so they are never part of a blob.
//!
//! ```text
//! h = floor((theta + horiz_span/2) · horiz_res / horiz_span)
//! v = floor((phi   + vert_span/2)  · vert_res  / vert_span)
//! ```
//!
//! Sensor noise routinely produces angles on or just beyond the edge of the
//! field of view, so an index outside `[0, res)` is clamped to the nearest
//! edge cell rather than rejected.  Points with no finite spherical form
//! (the sensor origin, or NaN input) are skipped.
//!
//! # Example
//!
//! ```rust
//! use sonilize_perception::{DepthGrid, GridGeometry, Point3, Reciprocal};
//!
//! let mut grid = DepthGrid::new(GridGeometry::default());
//! let stats = grid.quantize(&[Point3::new(0.0, 0.0, 1.0)], &Reciprocal);
//! assert_eq!(stats.accepted, 1);
//! assert_eq!(grid.occupied_cells(), 1);
//! assert!((grid.get(32, 32) - 1.0).abs() < 1e-6);
//! ```

use std::f32::consts::PI;

use sonilize_types::SonilizeError;
use tracing::warn;

use crate::mean::Bijection;
use crate::point_cloud::Point3;
use crate::spherical::Spherical;

// ────────────────────────────────────────────────────────────────────────────
// GridGeometry
// ────────────────────────────────────────────────────────────────────────────

/// Resolution and angular span of a [`DepthGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Number of cells along the horizontal (theta) axis.
    pub horiz_res: usize,
    /// Number of cells along the vertical (phi) axis.
    pub vert_res: usize,
    /// Total horizontal field of view covered by the grid (radians).
    pub horiz_span: f32,
    /// Total vertical field of view covered by the grid (radians).
    pub vert_span: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            horiz_res: 64,
            vert_res: 64,
            horiz_span: PI,
            vert_span: PI,
        }
    }
}

impl GridGeometry {
    pub fn new(horiz_res: usize, vert_res: usize, horiz_span: f32, vert_span: f32) -> Self {
        Self {
            horiz_res,
            vert_res,
            horiz_span,
            vert_span,
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.horiz_res * self.vert_res
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell indices `(h, v)` for a spherical sample, clamped into range.
    ///
    /// The third element is `true` when either index had to be clamped.
    pub fn cell_of(&self, s: &Spherical) -> (usize, usize, bool) {
        let (h, h_clamped) = axis_index(s.theta, self.horiz_span, self.horiz_res);
        let (v, v_clamped) = axis_index(s.phi, self.vert_span, self.vert_res);
        (h, v, h_clamped || v_clamped)
    }

    /// Viewing angles `(theta, phi)` represented by cell `(h, v)`.
    ///
    /// A cell is represented by the angles at its lower edge.
    pub fn angles_of(&self, h: usize, v: usize) -> (f32, f32) {
        let theta = h as f32 * self.horiz_span / self.horiz_res as f32 - self.horiz_span / 2.0;
        let phi = v as f32 * self.vert_span / self.vert_res as f32 - self.vert_span / 2.0;
        (theta, phi)
    }
}

fn axis_index(angle: f32, span: f32, res: usize) -> (usize, bool) {
    let raw = ((angle + span / 2.0) * res as f32 / span).floor();
    let last = res.saturating_sub(1);
    if raw < 0.0 {
        (0, true)
    } else if raw > last as f32 {
        (last, true)
    } else {
        (raw as usize, false)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DepthGrid
// ────────────────────────────────────────────────────────────────────────────

/// Per-frame counters reported by [`DepthGrid::quantize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantizeStats {
    /// Points that contributed to a cell (clamped ones included).
    pub accepted: usize,
    /// Accepted points whose cell index fell outside the grid and was clamped.
    pub clamped: usize,
    /// Points dropped because their spherical coordinates were not finite.
    pub skipped: usize,
}

/// A `horiz_res × vert_res` grid of aggregated radial distances.
///
/// The grid owns its buffers and is rebuilt in place by every call to
/// [`DepthGrid::quantize`], so one instance can be reused for every frame.
#[derive(Debug, Clone)]
pub struct DepthGrid {
    geometry: GridGeometry,
    /// `cells[h * vert_res + v]`
    cells: Vec<f32>,
    counts: Vec<u32>,
}

impl DepthGrid {
    /// Create a grid with every cell at `+inf`.
    pub fn new(geometry: GridGeometry) -> Self {
        Self::filled(geometry, f32::INFINITY)
    }

    /// Create a grid with every cell set to `value`.
    pub fn filled(geometry: GridGeometry, value: f32) -> Self {
        let n = geometry.len();
        Self {
            geometry,
            cells: vec![value; n],
            counts: vec![0; n],
        }
    }

    /// Build a grid from precomputed cell values laid out as
    /// `cells[h * vert_res + v]`.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::MalformedFrame`] when `cells.len()` does not
    /// match the geometry.
    pub fn from_cells(geometry: GridGeometry, cells: Vec<f32>) -> Result<Self, SonilizeError> {
        if cells.len() != geometry.len() {
            return Err(SonilizeError::MalformedFrame(format!(
                "grid of {}x{} needs {} cells, got {}",
                geometry.horiz_res,
                geometry.vert_res,
                geometry.len(),
                cells.len()
            )));
        }
        let counts = vec![0; cells.len()];
        Ok(Self {
            geometry,
            cells,
            counts,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn horiz_res(&self) -> usize {
        self.geometry.horiz_res
    }

    pub fn vert_res(&self) -> usize {
        self.geometry.vert_res
    }

    /// Aggregated distance of cell `(h, v)`.
    ///
    /// # Panics
    ///
    /// Panics if the indices are outside the grid.
    pub fn get(&self, h: usize, v: usize) -> f32 {
        self.cells[self.index(h, v)]
    }

    /// Overwrite cell `(h, v)`.
    ///
    /// # Panics
    ///
    /// Panics if the indices are outside the grid.
    pub fn set(&mut self, h: usize, v: usize, value: f32) {
        let i = self.index(h, v);
        self.cells[i] = value;
    }

    /// Number of cells holding a finite distance.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|d| d.is_finite()).count()
    }

    /// Rebuild the grid from `points`, aggregating each cell's distances
    /// with the f-mean of `transform`.
    pub fn quantize<B>(&mut self, points: &[Point3], transform: &B) -> QuantizeStats
    where
        B: Bijection + ?Sized,
    {
        self.cells.fill(0.0);
        self.counts.fill(0);

        let mut stats = QuantizeStats::default();
        for &p in points {
            let s = Spherical::of(p);
            if !s.is_finite() {
                stats.skipped += 1;
                continue;
            }
            let (h, v, clamped) = self.geometry.cell_of(&s);
            if clamped {
                stats.clamped += 1;
            }
            let i = self.index(h, v);
            self.cells[i] += transform.forward(s.r);
            self.counts[i] += 1;
            stats.accepted += 1;
        }

        for (cell, &count) in self.cells.iter_mut().zip(self.counts.iter()) {
            *cell = if count == 0 {
                f32::INFINITY
            } else {
                transform.inverse(*cell / count as f32)
            };
        }

        if stats.clamped > 0 || stats.skipped > 0 {
            warn!(
                clamped = stats.clamped,
                skipped = stats.skipped,
                "depth grid: points outside the field of view or non-finite"
            );
        }
        stats
    }

    fn index(&self, h: usize, v: usize) -> usize {
        assert!(
            h < self.geometry.horiz_res && v < self.geometry.vert_res,
            "cell ({h}, {v}) outside {}x{} grid",
            self.geometry.horiz_res,
            self.geometry.vert_res
        );
        h * self.geometry.vert_res + v
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
