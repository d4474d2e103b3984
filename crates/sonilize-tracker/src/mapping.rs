//! Blob position → channel volume and pan.

use std::f32::consts::PI;

use sonilize_perception::Blob;

/// Maps a blob's aggregated position to audio parameters.
///
/// - pan: `−theta / (horiz_span / 2)`; the edges `theta = ∓horiz_span/2`
///   map to `±1`.  Objects beyond the field of view exceed `[−1, 1]`.
/// - volume: `2^(−4 · r / max_distance)`; 1 at the sensor, 1/16 at
///   `max_distance`, decreasing monotonically with distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMapping {
    /// Horizontal field of view (radians).
    pub horiz_span: f32,
    /// Distance at which volume has fallen to 1/16 (metres).
    pub max_distance: f32,
}

impl Default for AudioMapping {
    fn default() -> Self {
        Self {
            horiz_span: PI,
            max_distance: 1.5,
        }
    }
}

impl AudioMapping {
    pub fn new(horiz_span: f32, max_distance: f32) -> Self {
        Self {
            horiz_span,
            max_distance,
        }
    }

    /// Unclamped pan for `blob`.
    pub fn pan_of(&self, blob: &Blob) -> f32 {
        -blob.average_theta() / (self.horiz_span / 2.0)
    }

    /// Volume for `blob`.
    pub fn volume_of(&self, blob: &Blob) -> f32 {
        2.0f32.powf(-4.0 * blob.average_r() / self.max_distance)
    }

    /// `(volume, pan)` clamped to `[0, 1]` and `[−1, 1]`, ready for a
    /// channel pool.
    pub fn volume_pan(&self, blob: &Blob) -> (f32, f32) {
        (
            self.volume_of(blob).clamp(0.0, 1.0),
            self.pan_of(blob).clamp(-1.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_at(r: f32, theta: f32) -> Blob {
        Blob::new(9, r, theta, 0.0)
    }

    #[test]
    fn volume_falls_off_exponentially() {
        let m = AudioMapping::default();
        assert!((m.volume_of(&blob_at(0.0, 0.1)) - 1.0).abs() < 1e-6);
        assert!((m.volume_of(&blob_at(1.5, 0.1)) - 1.0 / 16.0).abs() < 1e-6);
        assert!((m.volume_of(&blob_at(0.5, 0.1)) - 0.396_85).abs() < 1e-4);
    }

    #[test]
    fn volume_is_monotonically_decreasing() {
        let m = AudioMapping::default();
        let mut last = f32::INFINITY;
        for i in 0..20 {
            let v = m.volume_of(&blob_at(i as f32 * 0.2, 0.1));
            assert!(v < last);
            last = v;
        }
    }

    #[test]
    fn pan_mirrors_theta() {
        let m = AudioMapping::default();
        assert!(m.pan_of(&blob_at(1.0, 0.0)).abs() < 1e-6);
        assert!((m.pan_of(&blob_at(1.0, -PI / 2.0)) - 1.0).abs() < 1e-6);
        assert!((m.pan_of(&blob_at(1.0, PI / 4.0)) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn pan_is_unclamped_but_volume_pan_clamps() {
        let m = AudioMapping::new(PI / 2.0, 1.5);
        let wide = blob_at(1.0, -PI / 2.0);
        assert!((m.pan_of(&wide) - 2.0).abs() < 1e-6);
        let (volume, pan) = m.volume_pan(&wide);
        assert_eq!(pan, 1.0);
        assert!((0.0..=1.0).contains(&volume));
    }
}
