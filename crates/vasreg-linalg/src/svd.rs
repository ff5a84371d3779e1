//! Double precision 3×3 eigen and singular value decompositions.
//!
//! The singular value decomposition is computed from the Jacobi eigenanalysis
//! of the normal matrix `AᵀA`:
//!
//! ```text
//! AᵀA = V Λ Vᵀ,   σᵢ = sqrt(λᵢ),   uᵢ = A vᵢ / σᵢ
//! ```
//!
//! Left singular vectors belonging to vanishing singular values are completed
//! to an orthonormal, right-handed basis, so rank deficient inputs (three
//! correspondences, collinear samples, zero matrices) still produce a valid
//! decomposition. This is the case that matters for minimal-sample rigid
//! fitting.
//!
//! # Example
//!
//! ```
//! use glam::{DMat3, DVec3};
//! use vasreg_linalg::svd::svd3;
//!
//! let a = DMat3::from_diagonal(DVec3::new(1.0, 3.0, 2.0));
//! let svd = svd3(&a);
//! assert!((svd.s.x - 3.0).abs() < 1e-12);
//! ```

use glam::{DMat3, DVec3};

const MAX_SWEEPS: usize = 32;
const JACOBI_EPSILON: f64 = 1e-30;
// singular values come from the eigenvalues of AᵀA, so round-off in a rank
// deficient input surfaces around sqrt(f64::EPSILON) relative to s.x
const RANK_EPSILON: f64 = 1e-6;

/// Eigen decomposition of a symmetric 3×3 matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen3 {
    /// Eigenvalues sorted in descending order.
    pub values: DVec3,
    /// Unit eigenvectors stored as columns, in the order of `values`.
    pub vectors: DMat3,
}

/// Singular value decomposition `A = U diag(s) Vᵀ` of a 3×3 matrix.
#[derive(Debug, Clone)]
pub struct Svd3 {
    /// Left singular vectors as columns.
    pub u: DMat3,
    /// Singular values sorted in descending order.
    pub s: DVec3,
    /// Right singular vectors as columns.
    pub v: DMat3,
}

/// Cyclic Jacobi eigenanalysis of a symmetric 3×3 matrix.
///
/// Only the lower triangle is trusted to be symmetric with the upper one, the
/// caller is responsible for passing a symmetric matrix.
pub fn symmetric_eigen3(a: &DMat3) -> SymmetricEigen3 {
    // row-major working copy, m[r][c]
    let mut m = a.transpose().to_cols_array_2d();
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..MAX_SWEEPS {
        let off_diag = m[0][1] * m[0][1] + m[0][2] * m[0][2] + m[1][2] * m[1][2];
        if off_diag < JACOBI_EPSILON {
            break;
        }

        for (p, q) in [(0, 1), (0, 2), (1, 2)] {
            let apq = m[p][q];
            if apq == 0.0 {
                continue;
            }

            let theta = 0.5 * (m[q][q] - m[p][p]) / apq;
            let t = {
                let t = 1.0 / (theta.abs() + (theta * theta + 1.0).sqrt());
                if theta < 0.0 {
                    -t
                } else {
                    t
                }
            };
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            m[p][p] -= t * apq;
            m[q][q] += t * apq;
            m[p][q] = 0.0;
            m[q][p] = 0.0;

            for r in 0..3 {
                if r != p && r != q {
                    let arp = m[r][p];
                    let arq = m[r][q];
                    m[r][p] = c * arp - s * arq;
                    m[p][r] = m[r][p];
                    m[r][q] = s * arp + c * arq;
                    m[q][r] = m[r][q];
                }
            }

            for row in v.iter_mut() {
                let vrp = row[p];
                let vrq = row[q];
                row[p] = c * vrp - s * vrq;
                row[q] = s * vrp + c * vrq;
            }
        }
    }

    // sort eigenpairs by decreasing eigenvalue
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| m[j][j].total_cmp(&m[i][i]));

    let column = |k: usize| DVec3::new(v[0][k], v[1][k], v[2][k]);

    SymmetricEigen3 {
        values: DVec3::new(m[order[0]][order[0]], m[order[1]][order[1]], m[order[2]][order[2]]),
        vectors: DMat3::from_cols(column(order[0]), column(order[1]), column(order[2])),
    }
}

/// Compute the singular value decomposition of a 3×3 matrix.
pub fn svd3(a: &DMat3) -> Svd3 {
    let eigen = symmetric_eigen3(&(a.transpose() * *a));
    let v = eigen.vectors;

    let s0 = eigen.values.x.max(0.0).sqrt();
    let tolerance = s0 * RANK_EPSILON;
    // values below the tolerance are round-off of a rank deficient input
    let significant = |lambda: f64| {
        let sigma = lambda.max(0.0).sqrt();
        if sigma > tolerance {
            sigma
        } else {
            0.0
        }
    };
    let s = DVec3::new(s0, significant(eigen.values.y), significant(eigen.values.z));

    // left singular vectors of the non-vanishing singular values
    let u0 = if s.x > 0.0 {
        (*a * v.x_axis).normalize()
    } else {
        DVec3::X
    };
    let u1 = if s.y > 0.0 {
        let u1 = (*a * v.y_axis) / s.y;
        // re-orthogonalize against u0 to absorb round-off
        (u1 - u0 * u0.dot(u1)).normalize()
    } else {
        u0.any_orthonormal_vector()
    };
    // u2 completes a right-handed basis, then follows the sign of A v2 when
    // the third singular value is significant
    let u2 = u0.cross(u1).normalize();
    let u2 = if s.z > 0.0 && u2.dot(*a * v.z_axis) < 0.0 {
        -u2
    } else {
        u2
    };

    Svd3 {
        u: DMat3::from_cols(u0, u1, u2),
        s,
        v,
    }
}
