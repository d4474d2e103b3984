//! [`Tracker`] – frame-to-frame identity for blobs.
//!
//! Each frame the tracker receives the extractor's ranked blobs and updates
//! its set of [`Thing`]s:
//!
//! 1. For each blob, in ranking order, find the nearest thing (squared
//!    distance between cartesian centroids) among those not yet matched
//!    this frame.
//! 2. Within `epsilon`: the blob is the same object one frame later.  The
//!    thing takes the new blob, keeps its channel, and the channel's
//!    volume/pan follow the new position.
//! 3. Otherwise: a new object.  A channel is leased, its volume/pan set and
//!    playback started.  When no channel (or no tracking slot) is free the
//!    blob is reported as rejected and produces no thing.
//! 4. Things left unmatched are paused and their channels released.
//!
//! Matching is greedy in blob order, not a globally optimal assignment.
//! With several objects closer together than `epsilon`, an earlier blob
//! can claim a thing that a later blob matches better, swapping their
//! sounds.
//!
//! Capacity failures leave the tracker consistent and are only reported.
//! Invalid-state failures from the pool (a channel the tracker holds is
//! reported as not leased, or a fresh lease is a channel already held) are
//! logic bugs: they trip a `debug_assert!` in development builds and are
//! logged and skipped otherwise.

use sonilize_audio::ChannelPool;
use sonilize_perception::Blob;
use sonilize_types::{ChannelId, SonilizeError};
use tracing::{debug, error, info, warn};

use crate::mapping::AudioMapping;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// A blob bound to an audio channel, tracked across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thing {
    blob: Blob,
    channel: ChannelId,
}

impl Thing {
    /// The most recent blob matched to this thing.
    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }
}

/// Tracker parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Maximum centroid displacement between frames for a blob to continue
    /// an existing thing (metres).
    pub epsilon: f32,
    /// Maximum number of simultaneously tracked things.
    pub max_things: usize,
    pub mapping: AudioMapping,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.40,
            max_things: 4,
            mapping: AudioMapping::default(),
        }
    }
}

/// A blob that could not become a thing this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub blob: Blob,
    pub error: SonilizeError,
}

/// What one call to [`Tracker::update`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Channels of things matched to a blob this frame.
    pub continued: Vec<ChannelId>,
    /// Channels leased for new things.
    pub created: Vec<ChannelId>,
    /// Channels of things that disappeared, now released.
    pub released: Vec<ChannelId>,
    /// Blobs that produced no thing.
    pub rejected: Vec<Rejection>,
}

impl FrameReport {
    /// Number of things tracked after the update.
    pub fn tracked(&self) -> usize {
        self.continued.len() + self.created.len()
    }

    /// True when nothing was created, released or rejected.
    pub fn is_steady(&self) -> bool {
        self.created.is_empty() && self.released.is_empty() && self.rejected.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tracker
// ────────────────────────────────────────────────────────────────────────────

/// Owns the set of currently tracked [`Thing`]s.
///
/// The tracker never owns the channel pool; it is handed the pool on every
/// call so the caller can serialize access to it.
///
/// # Example
///
/// ```rust
/// use sonilize_audio::{ChannelPool, LoopedChannelPool};
/// use sonilize_perception::Blob;
/// use sonilize_tracker::{Tracker, TrackerConfig};
///
/// let mut pool = LoopedChannelPool::with_channels(4);
/// let mut tracker = Tracker::new(TrackerConfig::default());
///
/// let report = tracker.update(&mut pool, &[Blob::new(60, 1.0, 0.3, 0.0)]);
/// assert_eq!(report.created.len(), 1);
///
/// // Same object, slightly moved: the channel is kept.
/// let report = tracker.update(&mut pool, &[Blob::new(60, 1.05, 0.32, 0.0)]);
/// assert_eq!(report.continued.len(), 1);
/// assert_eq!(pool.leased(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    things: Vec<Thing>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            things: Vec::with_capacity(config.max_things),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Currently tracked things.
    pub fn things(&self) -> &[Thing] {
        &self.things
    }

    /// Channels held by the currently tracked things.
    pub fn channels(&self) -> Vec<ChannelId> {
        self.things.iter().map(|t| t.channel).collect()
    }

    /// Advance the tracker by one frame.
    ///
    /// `blobs` should be ranked nearest first, as produced by
    /// [`find_blobs`][sonilize_perception::find_blobs].
    pub fn update<P>(&mut self, pool: &mut P, blobs: &[Blob]) -> FrameReport
    where
        P: ChannelPool + ?Sized,
    {
        let mut previous = std::mem::take(&mut self.things);
        let mut next: Vec<Thing> = Vec::with_capacity(self.config.max_things);
        let mut report = FrameReport::default();
        let epsilon_sq = self.config.epsilon * self.config.epsilon;

        for blob in blobs {
            match nearest(&previous, blob) {
                Some((index, dist_sq)) if dist_sq <= epsilon_sq => {
                    let mut thing = previous.remove(index);
                    thing.blob = *blob;
                    match self.apply_volume_pan(pool, &thing) {
                        Ok(()) => {
                            report.continued.push(thing.channel);
                            next.push(thing);
                        }
                        Err(e) => {
                            pool_error(&e, "updating a continued thing");
                            release(pool, thing.channel);
                            report.released.push(thing.channel);
                            report.rejected.push(Rejection {
                                blob: *blob,
                                error: e,
                            });
                        }
                    }
                }
                _ => match self.create(pool, blob, &next, &previous) {
                    Ok(thing) => {
                        info!(channel = %thing.channel, r = blob.average_r(), "new thing");
                        report.created.push(thing.channel);
                        next.push(thing);
                    }
                    Err(error) => {
                        report.rejected.push(Rejection { blob: *blob, error });
                    }
                },
            }
        }

        for gone in previous {
            release(pool, gone.channel);
            info!(channel = %gone.channel, "thing lost");
            report.released.push(gone.channel);
        }

        self.things = next;
        debug!(
            channels = ?self.channels(),
            created = report.created.len(),
            released = report.released.len(),
            rejected = report.rejected.len(),
            "tracked things"
        );
        report
    }

    /// Drop every tracked thing, pausing and releasing its channel.
    ///
    /// Returns the released channels.
    pub fn clear<P>(&mut self, pool: &mut P) -> Vec<ChannelId>
    where
        P: ChannelPool + ?Sized,
    {
        let released: Vec<ChannelId> = self.things.drain(..).map(|t| t.channel).collect();
        for &channel in &released {
            release(pool, channel);
        }
        if !released.is_empty() {
            info!(count = released.len(), "released all tracked channels");
        }
        released
    }

    // Lease a channel for a new thing and start it playing.
    fn create<P>(
        &self,
        pool: &mut P,
        blob: &Blob,
        next: &[Thing],
        previous: &[Thing],
    ) -> Result<Thing, SonilizeError>
    where
        P: ChannelPool + ?Sized,
    {
        if next.len() >= self.config.max_things {
            warn!(max = self.config.max_things, "no tracking slot for new blob");
            return Err(SonilizeError::TrackerFull {
                max: self.config.max_things,
            });
        }

        let channel = pool.acquire().inspect_err(|e| {
            warn!(error = %e, r = blob.average_r(), "no channel for new blob");
        })?;

        if next.iter().chain(previous).any(|t| t.channel == channel) {
            let e = SonilizeError::ChannelAlreadyLeased(channel);
            pool_error(&e, "leasing a channel for a new thing");
            return Err(e);
        }

        let thing = Thing {
            blob: *blob,
            channel,
        };
        let started = self
            .apply_volume_pan(pool, &thing)
            .and_then(|()| pool.play(channel));
        if let Err(e) = started {
            pool_error(&e, "starting a new thing");
            if let Err(e) = pool.release(channel) {
                error!(channel = %channel, error = %e, "failed to return channel after start failure");
            }
            return Err(e);
        }
        Ok(thing)
    }

    fn apply_volume_pan<P>(&self, pool: &mut P, thing: &Thing) -> Result<(), SonilizeError>
    where
        P: ChannelPool + ?Sized,
    {
        let (volume, pan) = self.config.mapping.volume_pan(&thing.blob);
        pool.set_volume_pan(thing.channel, volume, pan)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Index and squared distance of the thing nearest to `blob`.
///
/// NaN distances (centroids at `theta = 0`) never win.
fn nearest(things: &[Thing], blob: &Blob) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    let mut best_dist_sq = f32::INFINITY;
    for (i, thing) in things.iter().enumerate() {
        let d = thing.blob.distance_sq_to(blob);
        if d < best_dist_sq {
            best_dist_sq = d;
            best = Some((i, d));
        }
    }
    best
}

fn release<P>(pool: &mut P, channel: ChannelId)
where
    P: ChannelPool + ?Sized,
{
    let result = pool.pause(channel).and_then(|()| pool.release(channel));
    if let Err(e) = result {
        pool_error(&e, "releasing a lost thing");
    }
}

/// Log a pool failure.  Invalid-state errors are caller bugs and also trip a
/// debug assertion; anything else (a volume or pan out of range) is a warning.
fn pool_error(e: &SonilizeError, during: &str) {
    if e.is_invalid_state() {
        error!(error = %e, "invalid channel state while {during}");
    } else {
        warn!(error = %e, "channel pool refused request while {during}");
    }
    debug_assert!(!e.is_invalid_state(), "invalid channel state while {during}: {e}");
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sonilize_audio::{LoopedChannelPool, StereoGains};
    use sonilize_perception::{BlobParams, DepthGrid, GridGeometry, Reciprocal, find_blobs};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Acquire(Result<ChannelId, SonilizeError>),
        Release(ChannelId),
        SetVolumePan(ChannelId, f32, f32),
        Play(ChannelId),
        Pause(ChannelId),
    }

    /// Wraps a real pool and records every call made through the trait.
    struct RecordingPool {
        inner: LoopedChannelPool,
        calls: Vec<Call>,
    }

    impl RecordingPool {
        fn new(n: usize) -> Self {
            Self {
                inner: LoopedChannelPool::with_channels(n),
                calls: Vec::new(),
            }
        }

        fn acquires(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Acquire(Ok(_))))
                .count()
        }
    }

    impl ChannelPool for RecordingPool {
        fn acquire(&mut self) -> Result<ChannelId, SonilizeError> {
            let r = self.inner.acquire();
            self.calls.push(Call::Acquire(r.clone()));
            r
        }
        fn release(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.calls.push(Call::Release(id));
            self.inner.release(id)
        }
        fn set_volume_pan(&mut self, id: ChannelId, volume: f32, pan: f32) -> Result<(), SonilizeError> {
            self.calls.push(Call::SetVolumePan(id, volume, pan));
            self.inner.set_volume_pan(id, volume, pan)
        }
        fn play(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.calls.push(Call::Play(id));
            self.inner.play(id)
        }
        fn pause(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.calls.push(Call::Pause(id));
            self.inner.pause(id)
        }
        fn capacity(&self) -> usize {
            self.inner.capacity()
        }
        fn leased(&self) -> usize {
            self.inner.leased()
        }
    }

    /// A pool that leases fine but refuses every volume/pan update.
    struct ForgetfulPool(LoopedChannelPool);

    impl ChannelPool for ForgetfulPool {
        fn acquire(&mut self) -> Result<ChannelId, SonilizeError> {
            self.0.acquire()
        }
        fn release(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.0.release(id)
        }
        fn set_volume_pan(&mut self, id: ChannelId, _: f32, _: f32) -> Result<(), SonilizeError> {
            Err(SonilizeError::InvalidChannel(id))
        }
        fn play(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.0.play(id)
        }
        fn pause(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.0.pause(id)
        }
        fn capacity(&self) -> usize {
            self.0.capacity()
        }
        fn leased(&self) -> usize {
            self.0.leased()
        }
    }

    /// A pool that rejects volume/pan updates as out of range once `refuse`
    /// is set.
    struct RangeRefusingPool {
        inner: LoopedChannelPool,
        refuse: bool,
    }

    impl ChannelPool for RangeRefusingPool {
        fn acquire(&mut self) -> Result<ChannelId, SonilizeError> {
            self.inner.acquire()
        }
        fn release(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.inner.release(id)
        }
        fn set_volume_pan(&mut self, id: ChannelId, volume: f32, pan: f32) -> Result<(), SonilizeError> {
            if self.refuse {
                return Err(SonilizeError::OutOfRange {
                    quantity: "volume".to_string(),
                    value: volume + 1.0,
                    min: 0.0,
                    max: 1.0,
                });
            }
            self.inner.set_volume_pan(id, volume, pan)
        }
        fn play(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.inner.play(id)
        }
        fn pause(&mut self, id: ChannelId) -> Result<(), SonilizeError> {
            self.inner.pause(id)
        }
        fn capacity(&self) -> usize {
            self.inner.capacity()
        }
        fn leased(&self) -> usize {
            self.inner.leased()
        }
    }

    fn blob(r: f32, theta: f32, phi: f32) -> Blob {
        Blob::new(60, r, theta, phi)
    }

    fn tracker() -> Tracker {
        Tracker::new(TrackerConfig::default())
    }

    // ── Creation ────────────────────────────────────────────────────────────

    #[test]
    fn single_square_becomes_centred_thing_on_channel_one() {
        let mut grid = DepthGrid::new(GridGeometry::default());
        for h in 31..34 {
            for v in 31..34 {
                grid.set(h, v, 0.5);
            }
        }
        let params = BlobParams {
            max_cell_distance: 1.5,
            min_size: 5,
            max_blob_distance: 1.5,
            max_count: 4,
        };
        let blobs = find_blobs(&grid, &Reciprocal, &params);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 9);
        assert!((blobs[0].average_r() - 0.5).abs() < 1e-5);

        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        let report = t.update(&mut pool, &blobs);

        assert_eq!(report.created, vec![ChannelId(1)]);
        let Call::SetVolumePan(id, volume, pan) = pool.calls[1] else {
            panic!("expected volume/pan after acquire, got {:?}", pool.calls);
        };
        assert_eq!(id, ChannelId(1));
        assert!((volume - 0.397).abs() < 1e-3, "volume {volume}");
        assert!(pan.abs() < 1e-5, "pan {pan}");
        assert_eq!(pool.calls[2], Call::Play(ChannelId(1)));
        assert!(pool.inner.is_playing(ChannelId(1)));
    }

    #[test]
    fn pool_of_one_rejects_second_simultaneous_blob() {
        let mut pool = RecordingPool::new(1);
        let mut t = tracker();
        let report = t.update(&mut pool, &[blob(0.6, 0.4, 0.0), blob(0.9, -0.6, 0.0)]);

        assert_eq!(report.created, vec![ChannelId(1)]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].error, SonilizeError::PoolExhausted);
        assert!((report.rejected[0].blob.average_r() - 0.9).abs() < 1e-6);
        assert_eq!(t.things().len(), 1);
        assert_eq!(t.things()[0].channel(), ChannelId(1));
    }

    #[test]
    fn tracker_full_rejects_before_leasing() {
        let mut pool = RecordingPool::new(4);
        let mut t = Tracker::new(TrackerConfig {
            max_things: 1,
            ..TrackerConfig::default()
        });
        let report = t.update(&mut pool, &[blob(0.6, 0.4, 0.0), blob(0.9, -0.6, 0.0)]);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.rejected[0].error, SonilizeError::TrackerFull { max: 1 });
        assert_eq!(pool.acquires(), 1);
    }

    #[test]
    fn out_of_view_blob_is_clamped_before_reaching_pool() {
        let mut pool = RecordingPool::new(1);
        let mut t = Tracker::new(TrackerConfig {
            mapping: AudioMapping::new(std::f32::consts::FRAC_PI_2, 1.5),
            ..TrackerConfig::default()
        });
        let report = t.update(&mut pool, &[blob(0.5, 1.2, 0.0)]);
        assert_eq!(report.created.len(), 1);
        assert!(pool.calls.contains(&Call::SetVolumePan(ChannelId(1), 2.0f32.powf(-4.0 / 3.0), -1.0)));
    }

    // ── Continuation ────────────────────────────────────────────────────────

    #[test]
    fn blob_within_epsilon_keeps_channel() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.3, 0.1)]);
        let report = t.update(&mut pool, &[blob(1.05, 0.32, 0.1)]);

        assert_eq!(report.continued, vec![ChannelId(1)]);
        assert!(report.is_steady());
        assert_eq!(pool.acquires(), 1, "a continued thing must not lease again");
        assert!((t.things()[0].blob().average_r() - 1.05).abs() < 1e-6);
    }

    #[test]
    fn continued_thing_follows_new_position() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
        t.update(&mut pool, &[blob(0.9, 0.35, 0.0)]);

        let expected = AudioMapping::default().volume_pan(&blob(0.9, 0.35, 0.0));
        let gains = pool.inner.gains(ChannelId(1)).unwrap();
        assert_eq!(gains, StereoGains::from_volume_pan(expected.0, expected.1));
    }

    #[test]
    fn blob_beyond_epsilon_leases_new_channel() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
        let report = t.update(&mut pool, &[blob(1.0, -0.5, 0.0)]);

        // The new lease happens before the lost thing is released.
        assert_eq!(report.created, vec![ChannelId(2)]);
        assert_eq!(report.released, vec![ChannelId(1)]);
        assert_eq!(pool.acquires(), 2);
        assert_eq!(t.channels(), vec![ChannelId(2)]);
    }

    // ── Loss ────────────────────────────────────────────────────────────────

    #[test]
    fn unmatched_thing_is_paused_then_released() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
        pool.calls.clear();

        let report = t.update(&mut pool, &[]);
        assert_eq!(report.released, vec![ChannelId(1)]);
        assert_eq!(
            pool.calls,
            vec![Call::Pause(ChannelId(1)), Call::Release(ChannelId(1))]
        );
        assert!(t.things().is_empty());
        assert_eq!(pool.leased(), 0);
    }

    #[test]
    fn clear_releases_every_channel() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(0.5, 0.4, 0.0), blob(0.9, -0.6, 0.0)]);
        assert_eq!(pool.leased(), 2);

        let released = t.clear(&mut pool);
        assert_eq!(released, vec![ChannelId(1), ChannelId(2)]);
        assert_eq!(pool.leased(), 0);
        assert!(t.clear(&mut pool).is_empty());
    }

    // ── Known limitations ───────────────────────────────────────────────────

    #[test]
    fn greedy_matching_lets_first_blob_take_contested_thing() {
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        // A on channel 1 at theta 0.2, B on channel 2 at theta 0.5.
        t.update(&mut pool, &[blob(0.95, 0.2, 0.0), blob(1.0, 0.5, 0.0)]);
        assert_eq!(t.channels(), vec![ChannelId(1), ChannelId(2)]);

        // X moved slightly from A, Y slightly from B, but X ranks first and
        // is marginally nearer to B, so it claims B; Y falls back to A.
        // An optimal assignment would keep X → A and Y → B.
        let x = blob(0.95, 0.36, 0.0);
        let y = blob(1.0, 0.52, 0.0);
        let report = t.update(&mut pool, &[x, y]);

        assert_eq!(report.continued, vec![ChannelId(2), ChannelId(1)]);
        assert!(report.is_steady());
    }

    #[test]
    fn blob_dead_ahead_never_matches_previous_frame() {
        // A centroid at exactly theta = 0 has a NaN cartesian z, so its
        // distance to anything is NaN and it is re-created every frame.
        let mut pool = RecordingPool::new(4);
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.0, 0.0)]);
        let report = t.update(&mut pool, &[blob(1.0, 0.0, 0.0)]);

        assert!(report.continued.is_empty());
        assert_eq!(report.created, vec![ChannelId(2)]);
        assert_eq!(report.released, vec![ChannelId(1)]);
    }

    #[test]
    fn range_error_from_pool_rejects_blob_without_asserting() {
        let mut pool = RangeRefusingPool {
            inner: LoopedChannelPool::with_channels(2),
            refuse: false,
        };
        let mut t = tracker();
        let first = t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
        assert_eq!(first.created, vec![ChannelId(1)]);

        // Continued thing: the channel is given back and the blob rejected.
        pool.refuse = true;
        let report = t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
        assert!(report.continued.is_empty());
        assert_eq!(report.released, vec![ChannelId(1)]);
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(report.rejected[0].error, SonilizeError::OutOfRange { .. }));
        assert!(t.things().is_empty());
        assert_eq!(pool.leased(), 0);

        // New thing: the lease is returned before the rejection.
        let report = t.update(&mut pool, &[blob(1.0, -0.3, 0.0)]);
        assert!(report.created.is_empty());
        assert!(matches!(report.rejected[0].error, SonilizeError::OutOfRange { .. }));
        assert_eq!(pool.leased(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "invalid channel state")]
    fn invalid_channel_state_is_asserted_in_debug_builds() {
        let mut pool = ForgetfulPool(LoopedChannelPool::with_channels(2));
        let mut t = tracker();
        t.update(&mut pool, &[blob(1.0, 0.3, 0.0)]);
    }
}
