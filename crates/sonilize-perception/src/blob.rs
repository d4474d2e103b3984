//! Blob Extractor.
//!
//! Segments a [`DepthGrid`] into connected clusters of near cells and keeps
//! the nearest few.
//!
//! 1. Scan the grid (horizontal index outer, vertical inner).  Every
//!    unvisited cell at or below `max_cell_distance` seeds a 4-connected
//!    flood fill that collects all reachable cells also at or below the
//!    threshold.  Every cell the fill touches is marked, including rejected
//!    neighbours, so no cell is examined twice.
//! 2. Each component becomes a candidate [`Blob`]: its size, the f-mean of
//!    its cells' distances and the arithmetic mean of its cells' angles.
//! 3. Candidates smaller than `min_size` or farther than
//!    `max_blob_distance` are dropped.
//! 4. The `max_count` nearest survivors are returned, nearest first.  The
//!    relative order of blobs at exactly equal distance is unspecified.
//!
//! # Example
//!
//! ```rust
//! use sonilize_perception::{find_blobs, BlobParams, DepthGrid, GridGeometry, Reciprocal};
//!
//! let mut grid = DepthGrid::new(GridGeometry::default());
//! for h in 31..34 {
//!     for v in 31..34 {
//!         grid.set(h, v, 0.5);
//!     }
//! }
//! let params = BlobParams { max_cell_distance: 1.5, min_size: 5, max_blob_distance: 1.5, max_count: 4 };
//! let blobs = find_blobs(&grid, &Reciprocal, &params);
//! assert_eq!(blobs.len(), 1);
//! assert_eq!(blobs[0].size(), 9);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::depth_grid::DepthGrid;
use crate::mean::{Bijection, generalized_mean};
use crate::point_cloud::Point3;
use crate::spherical::Spherical;

// ────────────────────────────────────────────────────────────────────────────
// Blob
// ────────────────────────────────────────────────────────────────────────────

/// One grid cell's contribution to a blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    pub r: f32,
    pub theta: f32,
    pub phi: f32,
}

/// An aggregate of contiguous grid cells representing one physical object's
/// footprint in a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    size: usize,
    average_r: f32,
    average_theta: f32,
    average_phi: f32,
}

impl Blob {
    /// Create a blob from already aggregated values.
    pub fn new(size: usize, average_r: f32, average_theta: f32, average_phi: f32) -> Self {
        Self {
            size,
            average_r,
            average_theta,
            average_phi,
        }
    }

    /// Aggregate a set of cell samples.  Distances are combined with the
    /// f-mean of `transform`, angles with the arithmetic mean.
    ///
    /// Returns `None` when `samples` is empty.
    pub fn from_samples<B>(samples: &[CellSample], transform: &B) -> Option<Self>
    where
        B: Bijection + ?Sized,
    {
        let average_r = generalized_mean(samples.iter().map(|s| s.r), transform)?;
        let n = samples.len() as f32;
        let average_theta = samples.iter().map(|s| s.theta).sum::<f32>() / n;
        let average_phi = samples.iter().map(|s| s.phi).sum::<f32>() / n;
        Some(Self::new(samples.len(), average_r, average_theta, average_phi))
    }

    /// Number of grid cells in the blob.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn average_r(&self) -> f32 {
        self.average_r
    }

    pub fn average_theta(&self) -> f32 {
        self.average_theta
    }

    pub fn average_phi(&self) -> f32 {
        self.average_phi
    }

    /// The blob's average position in viewing coordinates.
    pub fn centroid(&self) -> Spherical {
        Spherical::new(self.average_r, self.average_theta, self.average_phi)
    }

    /// The blob's average position as a cartesian point.
    ///
    /// Inherits the singularities of [`Spherical::to_cartesian`]: a blob
    /// centred exactly at `theta = 0` has a NaN `z`.
    pub fn centroid_cartesian(&self) -> Point3 {
        self.centroid().to_cartesian()
    }

    /// Squared euclidean distance between the two blobs' centroids.
    pub fn distance_sq_to(&self, other: &Blob) -> f32 {
        self.centroid_cartesian()
            .distance_sq(other.centroid_cartesian())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Thresholds for [`find_blobs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobParams {
    /// Cells farther than this are never part of a blob.
    pub max_cell_distance: f32,
    /// Minimum number of cells a blob must cover.
    pub min_size: usize,
    /// Maximum aggregated distance of a kept blob.
    pub max_blob_distance: f32,
    /// Maximum number of blobs returned.
    pub max_count: usize,
}

/// Find at most `params.max_count` blobs in `grid`, nearest first.
pub fn find_blobs<B>(grid: &DepthGrid, transform: &B, params: &BlobParams) -> Vec<Blob>
where
    B: Bijection + ?Sized,
{
    if params.max_count == 0 {
        return Vec::new();
    }

    let (horiz_res, vert_res) = (grid.horiz_res(), grid.vert_res());
    let mut marked = vec![false; horiz_res * vert_res];
    let mut stack = Vec::new();
    let mut samples = Vec::new();
    // Max-heap on distance: the farthest kept candidate is evicted first.
    let mut nearest: BinaryHeap<ByDistance> = BinaryHeap::with_capacity(params.max_count + 1);

    for h in 0..horiz_res {
        for v in 0..vert_res {
            if marked[h * vert_res + v] || !within(grid.get(h, v), params.max_cell_distance) {
                continue;
            }
            samples.clear();
            flood_fill(grid, &mut marked, &mut stack, &mut samples, params.max_cell_distance, h, v);

            let Some(blob) = Blob::from_samples(&samples, transform) else {
                continue;
            };
            if blob.size() < params.min_size || !within(blob.average_r(), params.max_blob_distance) {
                continue;
            }
            nearest.push(ByDistance(blob));
            if nearest.len() > params.max_count {
                nearest.pop();
            }
        }
    }

    nearest.into_sorted_vec().into_iter().map(|b| b.0).collect()
}

/// Collect the 4-connected component containing `(h0, v0)` into `out`.
fn flood_fill(
    grid: &DepthGrid,
    marked: &mut [bool],
    stack: &mut Vec<(usize, usize)>,
    out: &mut Vec<CellSample>,
    max_cell_distance: f32,
    h0: usize,
    v0: usize,
) {
    let (horiz_res, vert_res) = (grid.horiz_res(), grid.vert_res());
    let geometry = *grid.geometry();

    stack.clear();
    stack.push((h0, v0));
    while let Some((h, v)) = stack.pop() {
        let i = h * vert_res + v;
        if marked[i] {
            continue;
        }
        marked[i] = true;

        let r = grid.get(h, v);
        if !within(r, max_cell_distance) {
            continue;
        }
        let (theta, phi) = geometry.angles_of(h, v);
        out.push(CellSample { r, theta, phi });

        if h + 1 < horiz_res {
            stack.push((h + 1, v));
        }
        if v + 1 < vert_res {
            stack.push((h, v + 1));
        }
        if h > 0 {
            stack.push((h - 1, v));
        }
        if v > 0 {
            stack.push((h, v - 1));
        }
    }
}

/// `d <= max`, false for NaN.
fn within(d: f32, max: f32) -> bool {
    d <= max
}

/// Orders blobs by aggregated distance.
#[derive(Debug, Clone, Copy)]
struct ByDistance(Blob);

impl PartialEq for ByDistance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByDistance {}

impl PartialOrd for ByDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.average_r.total_cmp(&other.0.average_r)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth_grid::GridGeometry;
    use crate::mean::Reciprocal;

    fn params(min_size: usize, max_count: usize) -> BlobParams {
        BlobParams {
            max_cell_distance: 1.5,
            min_size,
            max_blob_distance: 1.5,
            max_count,
        }
    }

    fn paint(grid: &mut DepthGrid, hs: std::ops::Range<usize>, vs: std::ops::Range<usize>, r: f32) {
        for h in hs {
            for v in vs.clone() {
                grid.set(h, v, r);
            }
        }
    }

    // ── Blob aggregation ────────────────────────────────────────────────────

    #[test]
    fn blob_from_samples_averages() {
        let samples = [
            CellSample { r: 1.0, theta: -0.2, phi: 0.1 },
            CellSample { r: 3.0, theta: 0.4, phi: 0.3 },
        ];
        let b = Blob::from_samples(&samples, &Reciprocal).unwrap();
        assert_eq!(b.size(), 2);
        assert!((b.average_r() - 1.5).abs() < 1e-5);
        assert!((b.average_theta() - 0.1).abs() < 1e-5);
        assert!((b.average_phi() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn blob_from_no_samples_is_none() {
        assert!(Blob::from_samples(&[], &Reciprocal).is_none());
    }

    #[test]
    fn distance_between_blob_centroids() {
        let a = Blob::new(10, 1.0, 0.3, 0.0);
        let b = Blob::new(10, 1.2, 0.3, 0.0);
        // Same direction, 0.2 m apart along the ray.
        assert!((a.distance_sq_to(&b) - 0.04).abs() < 1e-5);
        assert!(a.distance_sq_to(&a).abs() < 1e-6);
    }

    // ── Extraction ──────────────────────────────────────────────────────────

    #[test]
    fn single_square_yields_one_blob() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 31..34, 31..34, 0.5);
        let blobs = find_blobs(&grid, &Reciprocal, &params(5, 4));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 9);
        assert!((blobs[0].average_r() - 0.5).abs() < 1e-5);
        // Cells 31..34 are represented by theta = (h - 32)·π/64.
        assert!(blobs[0].average_theta().abs() < 1e-5);
    }

    #[test]
    fn two_disjoint_clusters_ordered_nearest_first() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 5..10, 5..10, 1.2);
        paint(&mut grid, 40..46, 20..26, 0.7);
        let blobs = find_blobs(&grid, &Reciprocal, &params(5, 4));
        assert_eq!(blobs.len(), 2);
        assert!((blobs[0].average_r() - 0.7).abs() < 1e-5);
        assert_eq!(blobs[0].size(), 36);
        assert!((blobs[1].average_r() - 1.2).abs() < 1e-5);
        assert_eq!(blobs[1].size(), 25);
    }

    #[test]
    fn undersized_cluster_is_excluded() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 5..10, 5..10, 1.0);
        paint(&mut grid, 50..52, 50..52, 0.3); // 4 cells
        let blobs = find_blobs(&grid, &Reciprocal, &params(5, 4));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 25);
    }

    #[test]
    fn max_count_one_keeps_only_nearest() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 0..3, 0..3, 1.0);
        paint(&mut grid, 10..13, 10..13, 0.4);
        paint(&mut grid, 20..23, 20..23, 0.9);
        let blobs = find_blobs(&grid, &Reciprocal, &params(5, 1));
        assert_eq!(blobs.len(), 1);
        assert!((blobs[0].average_r() - 0.4).abs() < 1e-5);
    }

    #[test]
    fn max_count_zero_returns_nothing() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 0..3, 0..3, 1.0);
        assert!(find_blobs(&grid, &Reciprocal, &params(1, 0)).is_empty());
    }

    #[test]
    fn far_cells_split_components() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 10..20, 10..13, 1.0);
        // A wall of far cells cuts the strip in two.
        paint(&mut grid, 15..16, 10..13, 4.0);
        let blobs = find_blobs(&grid, &Reciprocal, &params(5, 4));
        assert_eq!(blobs.len(), 2);
        assert!(blobs.iter().all(|b| b.size() == 15 || b.size() == 12));
    }

    #[test]
    fn diagonal_cells_are_not_connected() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        for k in 0..6 {
            grid.set(10 + k, 10 + k, 0.5);
        }
        let blobs = find_blobs(&grid, &Reciprocal, &params(2, 10));
        assert!(blobs.is_empty());
        let singles = find_blobs(&grid, &Reciprocal, &params(1, 10));
        assert_eq!(singles.len(), 6);
    }

    #[test]
    fn blob_beyond_max_distance_is_dropped() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 10..14, 10..14, 1.4);
        let strict = BlobParams {
            max_blob_distance: 1.0,
            ..params(5, 4)
        };
        assert!(find_blobs(&grid, &Reciprocal, &strict).is_empty());
        assert_eq!(find_blobs(&grid, &Reciprocal, &params(5, 4)).len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        paint(&mut grid, 0..3, 0..3, 1.5);
        assert_eq!(find_blobs(&grid, &Reciprocal, &params(9, 4)).len(), 1);
    }

    #[test]
    fn component_touching_grid_edges() {
        let g = GridGeometry::new(4, 4, std::f32::consts::PI, std::f32::consts::PI);
        let grid = DepthGrid::filled(g, 0.9);
        let blobs = find_blobs(&grid, &Reciprocal, &params(16, 4));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 16);
    }
}
