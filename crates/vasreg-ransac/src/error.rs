use vasreg_3d::{features::FeatureError, voxel_grid::VoxelGridError};
use vasreg_linalg::rigid::UmeyamaError;

/// An error type for the global registration.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RansacError {
    /// One of the point clouds has no points.
    #[error("Cannot register an empty point cloud (moving: {0} points, fixed: {1} points)")]
    EmptyInput(usize, usize),

    /// The voxel spacing must be positive and finite.
    #[error("Invalid registration spacing {0}")]
    InvalidSpacing(f64),

    /// A RANSAC parameter is out of range.
    #[error("Invalid RANSAC parameter: {0}")]
    InvalidParameter(&'static str),

    /// Not enough correspondences to draw a sample.
    #[error("Found {0} correspondences, at least {1} are needed")]
    InsufficientCorrespondences(usize, usize),

    /// Every sampled transform was rejected by the checkers.
    #[error("No valid transform found after {0} trials")]
    NoValidTransform(usize),

    /// Feature extraction failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Voxel downsampling failed.
    #[error(transparent)]
    VoxelGrid(#[from] VoxelGridError),

    /// The rigid fit of a sample failed.
    #[error(transparent)]
    Rigid(#[from] UmeyamaError),
}
