use vasreg_3d::{ops::euclidean_distance, transforms::AffineTransform};

use crate::correspondence::Correspondence;

/// Prunes a RANSAC trial whose sampled source points do not all land within
/// `max_distance` of their target points once transformed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceChecker {
    /// Largest accepted distance between a moved source point and its target.
    pub max_distance: f64,
}

impl DistanceChecker {
    /// Create a checker with the given distance.
    pub fn new(max_distance: f64) -> Self {
        Self { max_distance }
    }

    /// Run the check on a sample of correspondences.
    pub fn check(
        &self,
        source: &[[f64; 3]],
        target: &[[f64; 3]],
        sample: &[Correspondence],
        transform: &AffineTransform,
    ) -> bool {
        sample.iter().all(|&(i, j)| {
            euclidean_distance(&transform.transform_point(&source[i]), &target[j])
                <= self.max_distance
        })
    }
}
