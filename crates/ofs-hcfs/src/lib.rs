//! Block-location queries over OrangeFS extent maps.
//!
//! A [`BlockLocationProvider`] answers "which nodes hold bytes
//! `[offset, offset + length)` of this file". The OrangeFS provider fetches
//! a fresh extent map through a [`ofs_client::MetaClient`], clips it to the
//! requested range ([`resolver`]) and shapes the result into
//! [`BlockLocation`] records ([`block_location`]).

pub mod block_location;
pub mod conformance;
pub mod error;
pub mod provider;
pub mod resolver;

pub use block_location::{BlockLocation, LocationFormatter};
pub use conformance::ConformanceError;
pub use error::LocateError;
pub use provider::{normalize_path, BlockLocationProvider, OfsBlockLocationProvider};
pub use resolver::{clip_extents, BlockLocationResolver, ClippedExtent};
