//! Point-cloud primitives.
//!
//! A depth sensor delivers each frame as a flat `f32` buffer of fixed-size
//! records, `(x, y, z, confidence)` for the usual stride of 4, together with
//! the number of valid points.  [`points_from_packed`] decodes that buffer
//! into [`Point3`]s; the confidence channel is not used by the pipeline.
//!
//! # Example
//!
//! ```rust
//! use sonilize_perception::point_cloud::{points_from_packed, Point3};
//!
//! let buffer = [0.1, 0.2, 1.0, 0.9,
//!               -0.3, 0.0, 2.0, 0.8];
//! let points = points_from_packed(&buffer, 4, 2).unwrap();
//! assert_eq!(points[1], Point3::new(-0.3, 0.0, 2.0));
//! ```

use serde::{Deserialize, Serialize};
use sonilize_types::SonilizeError;

/// Number of floats per record in the sensor's native point-cloud buffer.
pub const PACKED_STRIDE: usize = 4;

// ────────────────────────────────────────────────────────────────────────────
// Point3
// ────────────────────────────────────────────────────────────────────────────

/// A point in 3-D space, in the sensor frame (metres).
///
/// +Z points out of the sensor, +X to the right and +Y downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    /// Create a new point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Packed buffers
// ────────────────────────────────────────────────────────────────────────────

/// Decode `count` points from a packed buffer of `stride` floats per record.
///
/// Only the first three floats of every record are read.
///
/// # Errors
///
/// Returns [`SonilizeError::MalformedFrame`] when `stride < 3` or the buffer
/// holds fewer than `count * stride` floats.
pub fn points_from_packed(
    buffer: &[f32],
    stride: usize,
    count: usize,
) -> Result<Vec<Point3>, SonilizeError> {
    if stride < 3 {
        return Err(SonilizeError::MalformedFrame(format!(
            "stride {stride} is too small for (x, y, z) records"
        )));
    }
    let needed = count.checked_mul(stride).ok_or_else(|| {
        SonilizeError::MalformedFrame(format!("point count {count} overflows the buffer size"))
    })?;
    if buffer.len() < needed {
        return Err(SonilizeError::MalformedFrame(format!(
            "buffer holds {} floats, {count} points of stride {stride} need {needed}",
            buffer.len()
        )));
    }

    Ok(buffer[..needed]
        .chunks_exact(stride)
        .map(|rec| Point3::new(rec[0], rec[1], rec[2]))
        .collect())
}
