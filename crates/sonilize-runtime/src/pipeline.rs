//! [`Pipeline`] – one frame in, updated audio channels out.
//!
//! Each call to [`Pipeline::process`] runs the three stages in order:
//!
//! 1. **Quantize** – the frame's points are averaged (harmonic mean of
//!    distance) into the [`DepthGrid`].
//! 2. **Extract** – [`find_blobs`] segments the grid into the nearest
//!    connected blobs.
//! 3. **Track** – the [`Tracker`] matches blobs to tracked things and drives
//!    the [`ChannelPool`].
//!
//! The pipeline is not re-entrant; the [`driver`][crate::driver] serializes
//! frames onto one task.
//!
//! # Example
//!
//! ```rust
//! use sonilize_audio::{ChannelPool, LoopedChannelPool};
//! use sonilize_perception::Point3;
//! use sonilize_runtime::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig { min_blob_size: 1, ..PipelineConfig::default() };
//! let mut pipeline = Pipeline::new(config, LoopedChannelPool::with_channels(4)).unwrap();
//!
//! let report = pipeline.process(&[Point3::new(0.2, 0.0, 0.5)]);
//! assert_eq!(report.created.len(), 1);
//!
//! pipeline.shutdown();
//! assert_eq!(pipeline.pool().leased(), 0);
//! ```

use sonilize_audio::ChannelPool;
use sonilize_perception::{BlobParams, DepthGrid, Point3, Reciprocal, find_blobs};
use sonilize_tracker::{FrameReport, Tracker};
use sonilize_types::{ChannelId, SonilizeError};
use tracing::{debug, info, instrument};

use crate::config::PipelineConfig;

/// Owns the depth grid, tracked things and channel pool.
pub struct Pipeline<P: ChannelPool> {
    config: PipelineConfig,
    grid: DepthGrid,
    params: BlobParams,
    tracker: Tracker,
    pool: P,
    frames: u64,
}

impl<P: ChannelPool> Pipeline<P> {
    /// Build a pipeline over `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`SonilizeError::InvalidConfig`] if `config` fails
    /// [`PipelineConfig::validate`].
    pub fn new(config: PipelineConfig, pool: P) -> Result<Self, SonilizeError> {
        config.validate()?;
        if pool.capacity() < config.max_things {
            debug!(
                capacity = pool.capacity(),
                max_things = config.max_things,
                "channel pool smaller than max_things; extra objects will be rejected"
            );
        }
        Ok(Self {
            grid: DepthGrid::new(config.geometry()),
            params: config.blob_params(),
            tracker: Tracker::new(config.tracker_config()),
            config,
            pool,
            frames: 0,
        })
    }

    /// Run one frame through quantize, extract and track.
    #[instrument(skip_all, fields(points = points.len()))]
    pub fn process(&mut self, points: &[Point3]) -> FrameReport {
        let stats = self.grid.quantize(points, &Reciprocal);
        let blobs = find_blobs(&self.grid, &Reciprocal, &self.params);
        let report = self.tracker.update(&mut self.pool, &blobs);
        self.frames += 1;

        debug!(
            frame = self.frames,
            accepted = stats.accepted,
            occupied = self.grid.occupied_cells(),
            blobs = blobs.len(),
            channels = ?self.tracker.channels(),
            "frame processed"
        );
        report
    }

    /// Discard every tracked thing and release its channel.
    ///
    /// Called when frame delivery ends.  The pipeline stays usable; the
    /// next frame starts from an empty scene.
    pub fn shutdown(&mut self) -> Vec<ChannelId> {
        let released = self.tracker.clear(&mut self.pool);
        info!(
            frames = self.frames,
            released = released.len(),
            "pipeline shut down"
        );
        released
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// The depth grid of the most recent frame.
    pub fn grid(&self) -> &DepthGrid {
        &self.grid
    }

    /// Number of frames processed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Consume the pipeline, returning the pool.
    pub fn into_pool(self) -> P {
        self.pool
    }
}
