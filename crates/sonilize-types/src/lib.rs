use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to one of the fixed pool of simultaneous audio playback
/// slots.  Issued by a channel pool on `acquire` and handed back on
/// `release`; exactly one tracked thing holds a given id at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u32);

impl ChannelId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Global error type spanning channel capacity, range violations, invalid
/// channel state and malformed input.
///
/// The variants fall into three families:
/// - *capacity* (`PoolExhausted`, `TrackerFull`): recoverable, the affected
///   object is skipped for the current frame.
/// - *range* (`OutOfRange`): a volume/pan or similar quantity outside its
///   valid interval.
/// - *invalid state* (`InvalidChannel`, `ChannelAlreadyLeased`): a logic bug
///   in the caller.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SonilizeError {
    #[error("Channel pool exhausted: no free audio channel")]
    PoolExhausted,

    #[error("Tracker full: already tracking {max} things")]
    TrackerFull { max: usize },

    #[error("Invalid channel {0}: not currently leased")]
    InvalidChannel(ChannelId),

    #[error("Channel {0} is already leased")]
    ChannelAlreadyLeased(ChannelId),

    #[error("{quantity} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        quantity: String,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SonilizeError {
    /// True for errors that only mean "no room this frame" and leave the
    /// system in a consistent state.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::TrackerFull { .. })
    }

    /// True for errors that indicate a caller logic bug (operating on a
    /// channel that is not leased, or leasing one twice).
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidChannel(_) | Self::ChannelAlreadyLeased(_))
    }

    pub(crate) fn out_of_range(quantity: &str, value: f32, min: f32, max: f32) -> Self {
        Self::OutOfRange {
            quantity: quantity.to_string(),
            value,
            min,
            max,
        }
    }

    /// Check that `value` lies in `[min, max]`, returning
    /// [`SonilizeError::OutOfRange`] otherwise.  NaN is always out of range.
    pub fn check_range(quantity: &str, value: f32, min: f32, max: f32) -> Result<f32, Self> {
        if value >= min && value <= max {
            Ok(value)
        } else {
            Err(Self::out_of_range(quantity, value, min, max))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&ChannelId(3)).unwrap();
        assert_eq!(json, "3");
        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChannelId(3));
    }

    #[test]
    fn channel_id_display() {
        assert_eq!(ChannelId(7).to_string(), "ch7");
    }

    #[test]
    fn error_display() {
        let err = SonilizeError::InvalidChannel(ChannelId(2));
        assert!(err.to_string().contains("ch2"));

        let err2 = SonilizeError::TrackerFull { max: 4 };
        assert!(err2.to_string().contains('4'));
    }

    #[test]
    fn error_families() {
        assert!(SonilizeError::PoolExhausted.is_capacity());
        assert!(SonilizeError::TrackerFull { max: 1 }.is_capacity());
        assert!(SonilizeError::InvalidChannel(ChannelId(1)).is_invalid_state());
        assert!(SonilizeError::ChannelAlreadyLeased(ChannelId(1)).is_invalid_state());
        assert!(!SonilizeError::PoolExhausted.is_invalid_state());
    }

    #[test]
    fn check_range_accepts_bounds_and_rejects_outside() {
        assert!(SonilizeError::check_range("volume", 0.0, 0.0, 1.0).is_ok());
        assert!(SonilizeError::check_range("volume", 1.0, 0.0, 1.0).is_ok());
        let err = SonilizeError::check_range("pan", 1.5, -1.0, 1.0).unwrap_err();
        assert!(matches!(err, SonilizeError::OutOfRange { ref quantity, .. } if quantity == "pan"));
        assert!(SonilizeError::check_range("pan", f32::NAN, -1.0, 1.0).is_err());
    }
}
