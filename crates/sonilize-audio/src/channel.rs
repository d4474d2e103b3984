//! `ChannelPool` – a fixed set of looping voices, each bound to one sound.
//!
//! A voice is leased, steered with volume and pan, played or paused, then
//! returned.  Every operation reports failure as a [`SonilizeError`].

use serde::{Deserialize, Serialize};
use sonilize_types::{ChannelId, SonilizeError};

/// A fixed pool of simultaneous audio playback slots.
///
/// A channel is *leased* between a successful [`acquire`][Self::acquire] and
/// the matching [`release`][Self::release].  Every other operation requires
/// the channel to be leased.
pub trait ChannelPool: Send {
    /// Lease a free channel.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::PoolExhausted`] when every channel is leased.
    fn acquire(&mut self) -> Result<ChannelId, SonilizeError>;

    /// Return a leased channel to the pool, silencing it.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidChannel`] if `id` is not leased.
    fn release(&mut self, id: ChannelId) -> Result<(), SonilizeError>;

    /// Set the channel's volume (`[0, 1]`) and stereo pan (`[−1, 1]`,
    /// negative is left).
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidChannel`] if `id` is not leased, or
    /// [`SonilizeError::OutOfRange`] if either value is outside its range.
    fn set_volume_pan(&mut self, id: ChannelId, volume: f32, pan: f32)
    -> Result<(), SonilizeError>;

    /// Start looping playback.  Playing an already playing channel is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidChannel`] if `id` is not leased.
    fn play(&mut self, id: ChannelId) -> Result<(), SonilizeError>;

    /// Pause playback.  Pausing a paused channel is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidChannel`] if `id` is not leased.
    fn pause(&mut self, id: ChannelId) -> Result<(), SonilizeError>;

    /// Total number of channels in the pool.
    fn capacity(&self) -> usize;

    /// Number of channels currently leased.
    fn leased(&self) -> usize;
}

/// Check `volume ∈ [0, 1]` and `pan ∈ [−1, 1]`.
///
/// # Errors
///
/// Returns [`SonilizeError::OutOfRange`] naming the offending quantity.
pub fn validate_volume_pan(volume: f32, pan: f32) -> Result<(), SonilizeError> {
    SonilizeError::check_range("volume", volume, 0.0, 1.0)?;
    SonilizeError::check_range("pan", pan, -1.0, 1.0)?;
    Ok(())
}

/// Per-side gains of a stereo channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StereoGains {
    pub left: f32,
    pub right: f32,
}

impl StereoGains {
    pub const SILENT: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    /// Split `volume` between the two sides according to `pan`.
    ///
    /// ```text
    /// p     = pan / (1 + pan²) + 0.5
    /// left  = (1 − p) · volume
    /// right = p · volume
    /// ```
    ///
    /// The curve is steepest at the centre and flattens towards the edges;
    /// a hard pan of ±1 puts the whole volume on one side.
    pub fn from_volume_pan(volume: f32, pan: f32) -> Self {
        let p = pan / (1.0 + pan * pan) + 0.5;
        Self {
            left: (1.0 - p) * volume,
            right: p * volume,
        }
    }
}
