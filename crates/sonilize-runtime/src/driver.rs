//! Frame driver – serializes sensor frames onto a single pipeline task.
//!
//! [`FrameDriver::spawn`] moves a [`Pipeline`] into a tokio task that
//! receives [`PointCloudFrame`]s over a bounded mpsc channel and processes
//! them one at a time.  Every processed frame produces a
//! [`ProcessedFrame`], forwarded to an optional report channel.
//!
//! When every [`FrameSender`] is dropped (sensor disconnect, end of a
//! recording, Ctrl-C) the task calls [`Pipeline::shutdown`], releasing all
//! channels, and hands the pipeline back through [`FrameDriver::finish`].
//!
//! With [`drop_stale_frames`][crate::config::PipelineConfig::drop_stale_frames]
//! set, frames that queued up while the previous one was processed are
//! skipped and only the newest is processed.
//!
//! # Example
//!
//! ```rust
//! use sonilize_audio::LoopedChannelPool;
//! use sonilize_runtime::{FrameDriver, Pipeline, PipelineConfig, PointCloudFrame};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = Pipeline::new(PipelineConfig::default(), LoopedChannelPool::with_channels(4)).unwrap();
//!     let (driver, frames) = FrameDriver::spawn(pipeline, 8, None);
//!
//!     frames.send(PointCloudFrame::new(Vec::new())).await.unwrap();
//!     drop(frames);
//!
//!     let pipeline = driver.finish().await.unwrap();
//!     assert_eq!(pipeline.frames(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use sonilize_audio::ChannelPool;
use sonilize_tracker::FrameReport;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::frame::PointCloudFrame;
use crate::pipeline::Pipeline;

/// Sending half of the frame channel.
pub type FrameSender = mpsc::Sender<PointCloudFrame>;

/// The outcome of one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    /// Capture time of the processed frame.
    pub timestamp: DateTime<Utc>,
    /// Sequence number, starting at 1.
    pub frame: u64,
    /// Older frames skipped in favour of this one.
    pub dropped: usize,
    pub report: FrameReport,
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameDriver
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the task that owns a [`Pipeline`].
pub struct FrameDriver<P: ChannelPool + 'static> {
    handle: JoinHandle<Pipeline<P>>,
}

impl<P: ChannelPool + 'static> FrameDriver<P> {
    /// Spawn the pipeline task.
    ///
    /// `capacity` bounds the number of queued frames; senders wait when the
    /// queue is full.  Reports are sent to `reports` if given; a closed
    /// report channel does not stop processing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        pipeline: Pipeline<P>,
        capacity: usize,
        reports: Option<mpsc::UnboundedSender<ProcessedFrame>>,
    ) -> (Self, FrameSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(pipeline, rx, reports));
        (Self { handle }, tx)
    }

    /// Wait for the task to finish and take the pipeline back.
    ///
    /// The task finishes once every [`FrameSender`] is dropped.
    pub async fn finish(self) -> Result<Pipeline<P>, JoinError> {
        self.handle.await
    }
}

async fn run<P: ChannelPool>(
    mut pipeline: Pipeline<P>,
    mut frames: mpsc::Receiver<PointCloudFrame>,
    reports: Option<mpsc::UnboundedSender<ProcessedFrame>>,
) -> Pipeline<P> {
    let drop_stale = pipeline.config().drop_stale_frames;
    let mut reports = reports;
    info!(drop_stale, "frame driver started");

    while let Some(mut frame) = frames.recv().await {
        let mut dropped = 0;
        if drop_stale {
            loop {
                match frames.try_recv() {
                    Ok(newer) => {
                        frame = newer;
                        dropped += 1;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            if dropped > 0 {
                debug!(dropped, "skipped stale frames");
            }
        }

        let report = pipeline.process(&frame.points);
        let processed = ProcessedFrame {
            timestamp: frame.timestamp,
            frame: pipeline.frames(),
            dropped,
            report,
        };
        if let Some(tx) = &reports {
            if tx.send(processed).is_err() {
                warn!("report receiver dropped; continuing without reports");
                reports = None;
            }
        }
    }

    info!(frames = pipeline.frames(), "frame source closed");
    pipeline.shutdown();
    pipeline
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
