#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod anneal;
pub use anneal::*;

mod error;
pub use error::IcpError;

mod icp_vanilla;
pub use icp_vanilla::*;

mod ops;
pub use ops::{evaluate_registration, fit_transformation, RegistrationEvaluation};
