//! `sonilize-perception` – turns raw depth-sensor point clouds into ranked
//! blobs of nearby space.
//!
//! # Modules
//!
//! - [`point_cloud`] – [`Point3`][point_cloud::Point3] and decoding of the
//!   sensor's packed `(x, y, z, confidence)` buffers.
//! - [`spherical`] – [`Spherical`][spherical::Spherical]: conversion between
//!   cartesian points and `(r, theta, phi)` viewing coordinates.
//! - [`mean`] – [`Bijection`][mean::Bijection] and
//!   [`generalized_mean`][mean::generalized_mean]: f-means such as the
//!   harmonic mean, which weights near distances more heavily.
//! - [`depth_grid`] – [`DepthGrid`][depth_grid::DepthGrid]: quantizes a frame
//!   into a fixed-resolution grid of angular cells.
//! - [`blob`] – [`find_blobs`][blob::find_blobs]: flood-fill segmentation of
//!   the grid into connected [`Blob`][blob::Blob]s, nearest first.

pub mod blob;
pub mod depth_grid;
pub mod mean;
pub mod point_cloud;
pub mod spherical;

pub use blob::{Blob, BlobParams, find_blobs};
pub use depth_grid::{DepthGrid, GridGeometry, QuantizeStats};
pub use mean::{Bijection, Identity, Reciprocal, generalized_mean};
pub use point_cloud::{Point3, points_from_packed};
pub use spherical::Spherical;
