//! `sonilize-audio` – the audio-channel boundary.
//!
//! The perception pipeline never talks to an audio backend directly.  It
//! leases channels from a [`ChannelPool`][channel::ChannelPool] and drives
//! them through five operations: acquire, release, set volume/pan, play and
//! pause.  Backends implement the trait; everything above it is agnostic.
//!
//! # Modules
//!
//! - [`channel`] – the [`ChannelPool`][channel::ChannelPool] trait and
//!   [`StereoGains`][channel::StereoGains], the volume/pan → left/right
//!   conversion shared by backends.
//! - [`looped`] – [`LoopedChannelPool`][looped::LoopedChannelPool]: an
//!   in-process pool of named looped sound sources that hands out the least
//!   recently released channel first and records the state of every
//!   channel.  Used headless, in tests and by the CLI.

pub mod channel;
pub mod looped;

pub use channel::{ChannelPool, StereoGains, validate_volume_pan};
pub use looped::LoopedChannelPool;
