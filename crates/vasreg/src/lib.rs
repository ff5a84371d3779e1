#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use vasreg_3d as k3d;

#[doc(inline)]
pub use vasreg_icp as icp;

#[doc(inline)]
pub use vasreg_linalg as linalg;

#[doc(inline)]
pub use vasreg_ransac as ransac;

/// Registration parameters.
pub mod config;

/// Comparison of a predicted transform against a ground truth.
pub mod evaluation;

/// Error type of the registration pipeline.
pub mod error;

/// Coarse-to-fine registration of point clouds and masks.
pub mod pipeline;

pub use config::RegistrationConfig;
pub use error::RegistrationError;
pub use evaluation::{evaluate_transforms, EvaluationResult};
pub use pipeline::{register_label_volumes, register_masks, register_points, Registration};
