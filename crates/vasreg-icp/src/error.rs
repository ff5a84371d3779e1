use vasreg_3d::transforms::TransformError;
use vasreg_linalg::rigid::UmeyamaError;

/// An error type for the ICP refinement.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum IcpError {
    /// One of the point clouds has no points.
    #[error("Cannot run ICP on an empty point cloud (source: {0} points, target: {1} points)")]
    EmptyInput(usize, usize),

    /// The correspondence distance threshold must be positive and finite.
    #[error("Invalid correspondence threshold {0}")]
    InvalidThreshold(f64),

    /// The annealing schedule needs at least one step.
    #[error("The annealing schedule must have at least one step")]
    InvalidSchedule,

    /// The rigid fit of the correspondences failed.
    #[error(transparent)]
    Rigid(#[from] UmeyamaError),

    /// Moving the source points failed.
    #[error(transparent)]
    Transform(#[from] TransformError),
}
