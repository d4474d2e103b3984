//! In-process pool of looped sound sources.
//!
//! [`LoopedChannelPool`] owns a fixed, ordered list of named sound sources
//! (one per channel, ids starting at 1).  Free channels wait in a FIFO, so
//! [`acquire`][ChannelPool::acquire] always hands out the channel that has
//! been idle the longest; a newly appearing object is therefore unlikely to
//! reuse the sound of one that vanished a moment ago.
//!
//! The pool records the state of every channel (leased, playing, current
//! stereo gains) instead of driving a sound device, which lets the full
//! pipeline run headless in tests and from the CLI.
//!
//! # Example
//!
//! ```rust
//! use sonilize_audio::{ChannelPool, LoopedChannelPool};
//!
//! let mut pool = LoopedChannelPool::with_channels(2);
//! let id = pool.acquire().unwrap();
//! pool.set_volume_pan(id, 1.0, -1.0).unwrap();
//! pool.play(id).unwrap();
//! assert!(pool.is_playing(id));
//! assert_eq!(pool.gains(id).unwrap().left, 1.0);
//! ```

use std::collections::VecDeque;

use sonilize_types::{ChannelId, SonilizeError};
use tracing::debug;

use crate::channel::{ChannelPool, StereoGains, validate_volume_pan};

#[derive(Debug, Clone)]
struct LoopedChannel {
    source: String,
    leased: bool,
    playing: bool,
    gains: StereoGains,
}

/// A [`ChannelPool`] over a fixed set of looped sound sources.
#[derive(Debug, Clone)]
pub struct LoopedChannelPool {
    /// `channels[id - 1]`
    channels: Vec<LoopedChannel>,
    /// Least recently released at the front.
    free: VecDeque<ChannelId>,
}

impl LoopedChannelPool {
    /// Create a pool with one channel per sound source, in order.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<LoopedChannel> = sources
            .into_iter()
            .map(|s| LoopedChannel {
                source: s.into(),
                leased: false,
                playing: false,
                gains: StereoGains::SILENT,
            })
            .collect();
        let free = (1..=channels.len() as u32).map(ChannelId).collect();
        Self { channels, free }
    }

    /// Create a pool of `n` channels named `sound_1` … `sound_n`.
    pub fn with_channels(n: usize) -> Self {
        Self::new((1..=n).map(|i| format!("sound_{i}")))
    }

    /// Name of the sound source behind `id`.
    pub fn source(&self, id: ChannelId) -> Option<&str> {
        self.slot(id).map(|c| c.source.as_str())
    }

    /// Current stereo gains of `id`.
    pub fn gains(&self, id: ChannelId) -> Option<StereoGains> {
        self.slot(id).map(|c| c.gains)
    }

    pub fn is_leased(&self, id: ChannelId) -> bool {
        self.slot(id).is_some_and(|c| c.leased)
    }

    pub fn is_playing(&self, id: ChannelId) -> bool {
        self.slot(id).is_some_and(|c| c.playing)
    }

    /// Ids of all currently leased channels, ascending.
    pub fn leased_ids(&self) -> Vec<ChannelId> {
        (1..=self.channels.len() as u32)
            .map(ChannelId)
            .filter(|id| self.is_leased(*id))
            .collect()
    }

    fn slot(&self, id: ChannelId) -> Option<&LoopedChannel> {
        let i = (id.get() as usize).checked_sub(1)?;
        self.channels.get(i)
    }

    /// Mutable access to a channel that must currently be leased.
    fn leased_mut(&mut self, id: ChannelId) -> Result<&mut LoopedChannel, SonilizeError> {
        (id.get() as usize)
            .checked_sub(1)
            .and_then(|i| self.channels.get_mut(i))
            .filter(|c| c.leased)
            .ok_or(SonilizeError::InvalidChannel(id))
    }
}

impl ChannelPool for LoopedChannelPool {
    fn acquire(&mut self) -> Result<ChannelId, SonilizeError> {
        let id = self.free.pop_front().ok_or(SonilizeError::PoolExhausted)?;
        let channel = &mut self.channels[id.get() as usize - 1];
        if channel.leased {
            // The free list and the lease flags disagree; put it back.
            self.free.push_front(id);
            return Err(SonilizeError::ChannelAlreadyLeased(id));
        }
        channel.leased = true;
        debug!(channel = %id, source = %channel.source, "channel leased");
        Ok(id)
    }

    fn release(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
        let channel = self.leased_mut(id)?;
        channel.leased = false;
        channel.playing = false;
        channel.gains = StereoGains::SILENT;
        self.free.push_back(id);
        debug!(channel = %id, "channel released");
        Ok(())
    }

    fn set_volume_pan(
        &mut self,
        id: ChannelId,
        volume: f32,
        pan: f32,
    ) -> Result<(), SonilizeError> {
        let channel = self.leased_mut(id)?;
        validate_volume_pan(volume, pan)?;
        channel.gains = StereoGains::from_volume_pan(volume, pan);
        Ok(())
    }

    fn play(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
        self.leased_mut(id)?.playing = true;
        Ok(())
    }

    fn pause(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
        self.leased_mut(id)?.playing = false;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.channels.len()
    }

    fn leased(&self) -> usize {
        self.channels.len() - self.free.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
