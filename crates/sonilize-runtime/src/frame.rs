//! [`PointCloudFrame`] – one timestamped sensor frame.
//!
//! Recorded sessions are stored as newline-delimited JSON, one frame per
//! line:
//!
//! ```text
//! {"timestamp":"2026-01-05T10:00:00Z","points":[{"x":0.1,"y":0.0,"z":0.9}]}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sonilize_perception::{Point3, points_from_packed};
use sonilize_types::SonilizeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudFrame {
    pub timestamp: DateTime<Utc>,
    pub points: Vec<Point3>,
}

impl PointCloudFrame {
    /// A frame captured now.
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            timestamp: Utc::now(),
            points,
        }
    }

    /// Decode a frame from the sensor's packed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::MalformedFrame`] when the buffer does not
    /// hold `count` records of `stride` floats.
    pub fn from_packed(buffer: &[f32], stride: usize, count: usize) -> Result<Self, SonilizeError> {
        Ok(Self::new(points_from_packed(buffer, stride, count)?))
    }

    /// Parse one line of a recorded session.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::MalformedFrame`] when the line is not a
    /// valid frame.
    pub fn from_json_line(line: &str) -> Result<Self, SonilizeError> {
        serde_json::from_str(line).map_err(|e| SonilizeError::MalformedFrame(e.to_string()))
    }

    /// Encode as one line of a recorded session.
    pub fn to_json_line(&self) -> Result<String, SonilizeError> {
        serde_json::to_string(self).map_err(|e| SonilizeError::MalformedFrame(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recorded_line() {
        let line = r#"{"timestamp":"2026-01-05T10:00:00Z","points":[{"x":0.1,"y":0.0,"z":0.9},{"x":-0.2,"y":0.1,"z":1.1}]}"#;
        let frame = PointCloudFrame::from_json_line(line).unwrap();
        assert_eq!(frame.points.len(), 2);
        assert_eq!(frame.points[1], Point3::new(-0.2, 0.1, 1.1));
        assert_eq!(frame.timestamp.to_rfc3339(), "2026-01-05T10:00:00+00:00");
    }

    #[test]
    fn encoded_line_has_no_newline() {
        let frame = PointCloudFrame::new(vec![Point3::new(0.0, 0.0, 1.0)]);
        let line = frame.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(PointCloudFrame::from_json_line(&line).unwrap(), frame);
    }

    #[test]
    fn garbage_is_malformed() {
        for line in ["", "{}", r#"{"timestamp":"yesterday","points":[]}"#] {
            assert!(matches!(
                PointCloudFrame::from_json_line(line),
                Err(SonilizeError::MalformedFrame(_))
            ));
        }
    }

    #[test]
    fn packed_buffer_too_short_is_malformed() {
        assert!(PointCloudFrame::from_packed(&[0.0; 7], 4, 2).is_err());
        assert_eq!(PointCloudFrame::from_packed(&[0.0; 8], 4, 2).unwrap().points.len(), 2);
    }
}
