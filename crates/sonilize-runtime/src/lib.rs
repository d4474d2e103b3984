//! `sonilize-runtime` – runs the sonification pipeline over a stream of
//! sensor frames.
//!
//! # Modules
//!
//! - [`config`] – [`PipelineConfig`][config::PipelineConfig]: grid
//!   resolution, field of view, distance thresholds and tracker limits,
//!   all fixed at start-up.
//! - [`frame`] – [`PointCloudFrame`][frame::PointCloudFrame]: a timestamped
//!   point cloud, decodable from the sensor's packed buffer or from a
//!   recorded JSON line.
//! - [`pipeline`] – [`Pipeline`][pipeline::Pipeline]: quantize → extract →
//!   track for one frame, owning the tracked things and the
//!   [`ChannelPool`][sonilize_audio::ChannelPool].
//! - [`driver`] – [`FrameDriver`][driver::FrameDriver]: a tokio task that
//!   serializes frames onto the pipeline and releases every channel when
//!   the frame source closes.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod driver;
pub mod frame;
pub mod pipeline;
pub mod telemetry;

pub use config::PipelineConfig;
pub use driver::{FrameDriver, FrameSender, ProcessedFrame};
pub use frame::PointCloudFrame;
pub use pipeline::Pipeline;
pub use telemetry::{TracerProviderGuard, init_tracing};
