use rayon::prelude::*;
use vasreg_3d::{kdtree::PointIndex, transforms::AffineTransform};
use vasreg_linalg::rigid::umeyama;

use crate::IcpError;

/// Quality of an alignment for a given correspondence threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationEvaluation {
    /// Fraction of source points with a target point within the threshold.
    pub fitness: f64,
    /// RMSE over the inlier correspondences, `0` when there are none.
    pub inlier_rmse: f64,
}

/// Correspondences between the source and the target as parallel point lists.
pub(crate) struct Correspondences {
    pub(crate) source: Vec<[f64; 3]>,
    pub(crate) target: Vec<[f64; 3]>,
    pub(crate) squared_distances: Vec<f64>,
}

impl Correspondences {
    /// Fitness and inlier RMSE of the correspondences for `num_source` points.
    pub(crate) fn evaluation(&self, num_source: usize) -> RegistrationEvaluation {
        let count = self.squared_distances.len();
        if count == 0 || num_source == 0 {
            return RegistrationEvaluation {
                fitness: 0.0,
                inlier_rmse: 0.0,
            };
        }
        let error = self.squared_distances.iter().sum::<f64>();
        RegistrationEvaluation {
            fitness: count as f64 / num_source as f64,
            inlier_rmse: (error / count as f64).sqrt(),
        }
    }
}

/// Pair every source point with its nearest target point, discarding the
/// pairs further apart than `threshold`.
pub(crate) fn find_correspondences(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    index: &PointIndex,
    threshold: f64,
) -> Correspondences {
    let matches = source
        .par_iter()
        .map(|p| index.nearest_within(p, threshold).map(|(j, d2)| (*p, target[j], d2)))
        .collect::<Vec<_>>();

    let mut correspondences = Correspondences {
        source: Vec::with_capacity(matches.len()),
        target: Vec::with_capacity(matches.len()),
        squared_distances: Vec::with_capacity(matches.len()),
    };
    for (p, q, d2) in matches.into_iter().flatten() {
        correspondences.source.push(p);
        correspondences.target.push(q);
        correspondences.squared_distances.push(d2);
    }
    correspondences
}

/// Compute the rigid transformation mapping `points_in_src` onto `points_in_dst`.
///
/// An empty correspondence set gives the identity.
pub fn fit_transformation(
    points_in_src: &[[f64; 3]],
    points_in_dst: &[[f64; 3]],
) -> Result<AffineTransform, IcpError> {
    if points_in_src.is_empty() && points_in_dst.is_empty() {
        return Ok(AffineTransform::identity());
    }
    let (rotation, translation, _) = umeyama(points_in_src, points_in_dst)?;
    Ok(AffineTransform::from_rotation_translation(rotation, translation))
}

/// Evaluate how well `transform` aligns `source` with `target`.
pub fn evaluate_registration(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    transform: &AffineTransform,
    threshold: f64,
) -> RegistrationEvaluation {
    let index = PointIndex::new(target);
    let moved = source
        .iter()
        .map(|p| transform.transform_point(p))
        .collect::<Vec<_>>();
    find_correspondences(&moved, target, &index, threshold).evaluation(source.len())
}
