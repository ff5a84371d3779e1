#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Geometric consistency checks run on the sampled correspondences.
pub mod checker;

/// Correspondences from feature descriptors.
pub mod correspondence;

mod error;
pub use error::RansacError;

mod global;
pub use global::*;

mod ransac;
pub use ransac::*;
