use vasreg_3d::{mask::MaskError, transforms::TransformError};
use vasreg_icp::IcpError;
use vasreg_ransac::RansacError;

/// An error type for the registration pipeline.
#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    /// One of the inputs has no points.
    #[error("Cannot register an empty point cloud (moving: {0} points, fixed: {1} points)")]
    EmptyInput(usize, usize),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The mask or its geometry is malformed.
    #[error(transparent)]
    Mask(#[from] MaskError),

    /// A transform could not be interpreted.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The global registration failed.
    #[error(transparent)]
    Ransac(#[from] RansacError),

    /// The local refinement failed.
    #[error(transparent)]
    Icp(#[from] IcpError),

    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
