//! `sonilize-tracker` – gives blobs an identity over time and a voice.
//!
//! # Modules
//!
//! - [`mapping`] – [`AudioMapping`][mapping::AudioMapping]: derives stereo
//!   pan from a blob's horizontal angle and volume from its distance.
//! - [`tracker`] – [`Tracker`][tracker::Tracker]: matches each frame's blobs
//!   to the previously tracked [`Thing`][tracker::Thing]s by nearest
//!   centroid, leasing a channel from the
//!   [`ChannelPool`][sonilize_audio::ChannelPool] for every new object and
//!   releasing the channels of objects that disappeared.

pub mod mapping;
pub mod tracker;

pub use mapping::AudioMapping;
pub use tracker::{FrameReport, Rejection, Thing, Tracker, TrackerConfig};
