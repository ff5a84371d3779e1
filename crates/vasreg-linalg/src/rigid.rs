//! Rigid alignment utilities (Kabsch / Umeyama)

use glam::{DMat3, DVec3};
use thiserror::Error;

use crate::svd::svd3;

/// Rotation (R), translation (t), and scale (s) output of Umeyama without scaling (s = 1).
pub type UmeyamaOutput = ([[f64; 3]; 3], [f64; 3], f64);

/// Error type for Umeyama rigid alignment operations.
#[derive(Debug, Error, PartialEq)]
pub enum UmeyamaError {
    /// Source and destination arrays must have the same length
    #[error("Source and destination arrays must have the same length ({0} != {1})")]
    MismatchedInputLengths(usize, usize),

    /// At least one correspondence is needed
    #[error("Cannot fit a rigid transform without correspondences")]
    EmptyInput,
}

/// Result type alias for Umeyama.
pub type UmeyamaResult = Result<UmeyamaOutput, UmeyamaError>;

/// Umeyama/Kabsch algorithm without scale.
///
/// Finds the proper rotation `R` and translation `t` minimizing
/// `Σ ‖dst_i − (R src_i + t)‖²`. Returns `(R, t, s)` where `s == 1.0` and `R`
/// is row-major.
///
/// One or two correspondences are accepted: the rotation is then only
/// determined up to the unconstrained axes and the decomposition picks the
/// closest proper rotation.
pub fn umeyama(src: &[[f64; 3]], dst: &[[f64; 3]]) -> UmeyamaResult {
    if src.len() != dst.len() {
        return Err(UmeyamaError::MismatchedInputLengths(src.len(), dst.len()));
    }
    if src.is_empty() {
        return Err(UmeyamaError::EmptyInput);
    }
    let n = src.len() as f64;

    let mu_s = src.iter().fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p)) / n;
    let mu_d = dst.iter().fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p)) / n;

    // H = 1/n Σ (dst_i - mu_d) (src_i - mu_s)^T
    let h = src
        .iter()
        .zip(dst.iter())
        .fold(DMat3::ZERO, |acc, (s, d)| {
            let sc = DVec3::from_array(*s) - mu_s;
            let dc = DVec3::from_array(*d) - mu_d;
            acc + DMat3::from_cols(dc * sc.x, dc * sc.y, dc * sc.z)
        })
        / n;

    let svd = svd3(&h);
    let (u, v) = (svd.u, svd.v);

    // reflection handling: R = U diag(1, 1, d) V^T
    let d = (u * v.transpose()).determinant();
    let r = if d < 0.0 {
        u * DMat3::from_diagonal(DVec3::new(1.0, 1.0, -1.0)) * v.transpose()
    } else {
        u * v.transpose()
    };

    let t = mu_d - r * mu_s;

    Ok((r.transpose().to_cols_array_2d(), t.to_array(), 1.0))
}
