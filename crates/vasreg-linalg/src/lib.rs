#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Rigid alignment of corresponding point sets.
pub mod rigid;

/// Eigen and singular value decompositions of 3x3 matrices.
pub mod svd;
