use glam::{DMat3, DVec3};
use rayon::prelude::*;
use vasreg_linalg::svd::symmetric_eigen3;

use crate::{kdtree::PointIndex, pointcloud::PointCloud};

/// The up-vector assigned when normals are not estimated.
pub const UP_VECTOR: [f64; 3] = [0.0, 1.0, 0.0];

/// How normals are assigned to a point cloud before feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NormalEstimation {
    /// Every point gets the same normal.
    Constant([f64; 3]),
    /// Smallest principal axis of the local neighborhood, oriented so that it
    /// points along `+y`.
    LocalPca {
        /// Neighborhood radius.
        radius: f64,
        /// Maximum number of neighbors.
        max_nn: usize,
    },
}

impl Default for NormalEstimation {
    fn default() -> Self {
        NormalEstimation::Constant(UP_VECTOR)
    }
}

/// Return a copy of the cloud carrying normals computed with `method`.
///
/// Points with fewer than three neighbors for the PCA fall back to the
/// up-vector.
pub fn estimate_normals(cloud: &PointCloud, method: &NormalEstimation) -> PointCloud {
    let normals = match *method {
        NormalEstimation::Constant(normal) => vec![normal; cloud.len()],
        NormalEstimation::LocalPca { radius, max_nn } => {
            let index = PointIndex::new(cloud.points());
            cloud
                .points()
                .par_iter()
                .map(|p| {
                    let neighbors = index.search_hybrid(p, radius, max_nn);
                    let neighborhood = neighbors
                        .iter()
                        .map(|(j, _)| cloud.points()[*j])
                        .collect::<Vec<_>>();
                    pca_normal(&neighborhood).unwrap_or(UP_VECTOR)
                })
                .collect()
        }
    };

    cloud.clone().with_normals(normals)
}

/// Normal of a neighborhood as the eigenvector of the smallest covariance eigenvalue.
fn pca_normal(points: &[[f64; 3]]) -> Option<[f64; 3]> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p))
        / n;
    let covariance = points.iter().fold(DMat3::ZERO, |acc, p| {
        let d = DVec3::from_array(*p) - mean;
        acc + DMat3::from_cols(d * d.x, d * d.y, d * d.z)
    }) / n;

    let eigen = symmetric_eigen3(&covariance);
    let normal = eigen.vectors.z_axis;
    if !normal.is_finite() || normal.length_squared() == 0.0 {
        return None;
    }
    let normal = normal.normalize();
    let oriented = if normal.dot(DVec3::from_array(UP_VECTOR)) < 0.0 {
        -normal
    } else {
        normal
    };
    Some(oriented.to_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_normals() {
        let cloud = PointCloud::from_points(vec![[0.0; 3], [1.0; 3]]);
        let with_normals = estimate_normals(&cloud, &NormalEstimation::default());
        assert_eq!(with_normals.normals(), Some(&[UP_VECTOR, UP_VECTOR][..]));
        assert_eq!(with_normals.points(), cloud.points());
    }

    #[test]
    fn test_plane_normals() {
        // points on the plane y = 2
        let points = (0..10)
            .flat_map(|i| (0..10).map(move |j| [i as f64 * 0.5, 2.0, j as f64 * 0.5]))
            .collect::<Vec<_>>();
        let cloud = PointCloud::from_points(points);
        let method = NormalEstimation::LocalPca {
            radius: 1.2,
            max_nn: 30,
        };
        let with_normals = estimate_normals(&cloud, &method);
        for n in with_normals.normals().unwrap_or_default() {
            assert_relative_eq!(n[1], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sparse_neighborhood_falls_back() {
        let cloud = PointCloud::from_points(vec![[0.0; 3], [10.0, 0.0, 0.0]]);
        let method = NormalEstimation::LocalPca {
            radius: 1.0,
            max_nn: 30,
        };
        let with_normals = estimate_normals(&cloud, &method);
        assert_eq!(with_normals.normals(), Some(&[UP_VECTOR, UP_VECTOR][..]));
    }
}
