//! Fast Point Feature Histograms (FPFH).
//!
//! Rusu, Blodow and Beetz, "Fast Point Feature Histograms (FPFH) for 3D
//! Registration", ICRA 2009. Each point gets three 11-bin histograms of the
//! Darboux-frame angles between its normal and the normals of its neighbors
//! (SPFH), then the histograms of the neighbors are blended in with inverse
//! squared-distance weights.

use std::f64::consts::PI;

use glam::DVec3;
use rayon::prelude::*;

use crate::{kdtree::PointIndex, pointcloud::PointCloud};

/// Number of bins per angular feature.
pub const FPFH_BINS: usize = 11;

/// Length of an FPFH descriptor.
pub const FPFH_DIM: usize = 3 * FPFH_BINS;

/// A 33-dimensional FPFH descriptor.
pub type FpfhDescriptor = [f64; FPFH_DIM];

/// Error type for the feature extraction.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeatureError {
    /// Features need one normal per point.
    #[error("Point cloud has no normals")]
    MissingNormals,

    /// Normals and points differ in length.
    #[error("Number of normals ({0}) does not match the number of points ({1})")]
    NormalsLengthMismatch(usize, usize),
}

/// Neighborhood used for the feature computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSearch {
    /// Search radius.
    pub radius: f64,
    /// Maximum number of neighbors, the closest ones are kept.
    pub max_nn: usize,
}

/// Angular features of an oriented point pair `(f1, f2, f3, f4)`:
/// the Darboux frame angles and the pair distance.
pub(crate) fn compute_pair_features(p1: DVec3, n1: DVec3, p2: DVec3, n2: DVec3) -> [f64; 4] {
    let mut dp2p1 = p2 - p1;
    let f4 = dp2p1.length();
    if f4 == 0.0 {
        return [0.0; 4];
    }

    let angle1 = n1.dot(dp2p1) / f4;
    let angle2 = n2.dot(dp2p1) / f4;

    // the source of the frame is the point whose normal is closer to the pair direction
    let (n1, n2, f3) = if angle1.abs().acos() > angle2.abs().acos() {
        dp2p1 = -dp2p1;
        (n2, n1, -angle2)
    } else {
        (n1, n2, angle1)
    };

    let v = dp2p1.cross(n1);
    let v_norm = v.length();
    if v_norm == 0.0 {
        return [0.0; 4];
    }
    let v = v / v_norm;
    let w = n1.cross(v);

    let f2 = v.dot(n2);
    let f1 = w.dot(n2).atan2(n1.dot(n2));

    [f1, f2, f3, f4]
}

#[inline]
fn bin(value: f64) -> usize {
    (value.floor().max(0.0) as usize).min(FPFH_BINS - 1)
}

/// Simplified point feature histogram of every point.
fn compute_spfh(
    points: &[[f64; 3]],
    normals: &[[f64; 3]],
    neighborhoods: &[Vec<(usize, f64)>],
) -> Vec<FpfhDescriptor> {
    neighborhoods
        .par_iter()
        .enumerate()
        .map(|(i, neighbors)| {
            let mut feature = [0.0; FPFH_DIM];
            let others = neighbors.iter().filter(|(j, _)| *j != i).count();
            if others == 0 {
                return feature;
            }
            let hist_incr = 100.0 / others as f64;

            let p1 = DVec3::from_array(points[i]);
            let n1 = DVec3::from_array(normals[i]);
            for &(j, _) in neighbors.iter().filter(|(j, _)| *j != i) {
                let pf = compute_pair_features(
                    p1,
                    n1,
                    DVec3::from_array(points[j]),
                    DVec3::from_array(normals[j]),
                );
                let h0 = bin(FPFH_BINS as f64 * (pf[0] + PI) / (2.0 * PI));
                let h1 = bin(FPFH_BINS as f64 * (pf[1] + 1.0) * 0.5);
                let h2 = bin(FPFH_BINS as f64 * (pf[2] + 1.0) * 0.5);
                feature[h0] += hist_incr;
                feature[FPFH_BINS + h1] += hist_incr;
                feature[2 * FPFH_BINS + h2] += hist_incr;
            }
            feature
        })
        .collect()
}

/// Compute the FPFH descriptor of every point of an oriented point cloud.
///
/// The output is parallel to the points of `cloud` and does not depend on the
/// number of threads.
pub fn compute_fpfh_features(
    cloud: &PointCloud,
    search: &FeatureSearch,
) -> Result<Vec<FpfhDescriptor>, FeatureError> {
    let normals = cloud.normals().ok_or(FeatureError::MissingNormals)?;
    if normals.len() != cloud.len() {
        return Err(FeatureError::NormalsLengthMismatch(normals.len(), cloud.len()));
    }
    let points = cloud.points();

    let index = PointIndex::new(points);
    let neighborhoods = points
        .par_iter()
        .map(|p| index.search_hybrid(p, search.radius, search.max_nn))
        .collect::<Vec<_>>();

    let spfh = compute_spfh(points, normals, &neighborhoods);

    let fpfh = neighborhoods
        .par_iter()
        .enumerate()
        .map(|(i, neighbors)| {
            let mut feature = [0.0; FPFH_DIM];
            let mut sum = [0.0; 3];
            for &(j, dist2) in neighbors.iter().filter(|(j, _)| *j != i) {
                if dist2 == 0.0 {
                    continue;
                }
                for (k, value) in feature.iter_mut().enumerate() {
                    let weighted = spfh[j][k] / dist2;
                    sum[k / FPFH_BINS] += weighted;
                    *value += weighted;
                }
            }
            for s in sum.iter_mut() {
                if *s != 0.0 {
                    *s = 100.0 / *s;
                }
            }
            for (k, value) in feature.iter_mut().enumerate() {
                *value = *value * sum[k / FPFH_BINS] + spfh[i][k];
            }
            feature
        })
        .collect::<Vec<_>>();

    log::debug!("computed {} fpfh features", fpfh.len());

    Ok(fpfh)
}

/// Squared L2 distance between two descriptors.
#[inline]
pub fn descriptor_distance2(a: &FpfhDescriptor, b: &FpfhDescriptor) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normals::{estimate_normals, NormalEstimation};
    use approx::assert_relative_eq;

    fn helix(n: usize, offset: [f64; 3]) -> PointCloud {
        PointCloud::from_points(
            (0..n)
                .map(|i| {
                    let t = i as f64 * 0.21;
                    [
                        offset[0] + 3.0 * t.cos(),
                        offset[1] + 0.4 * t,
                        offset[2] + 3.0 * t.sin() + 0.1 * (3.0 * t).sin(),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_pair_features() {
        let up = DVec3::Y;
        let f = compute_pair_features(DVec3::ZERO, up, DVec3::new(1.0, 1.0, 0.0), up);
        // parallel normals: no rotation between the frames
        assert_relative_eq!(f[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(f[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(f[2], 1.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(f[3], 2f64.sqrt(), epsilon = 1e-12);

        assert_eq!(compute_pair_features(DVec3::ZERO, up, DVec3::ZERO, up), [0.0; 4]);
    }

    #[test]
    fn test_histograms_are_normalized() -> Result<(), FeatureError> {
        let cloud = estimate_normals(&helix(200, [0.0; 3]), &NormalEstimation::default());
        let search = FeatureSearch {
            radius: 2.0,
            max_nn: 60,
        };
        let features = compute_fpfh_features(&cloud, &search)?;
        assert_eq!(features.len(), cloud.len());
        for feature in &features {
            // each of the three blocks sums to 200 (100 from SPFH, 100 from the neighbors)
            for block in feature.chunks(FPFH_BINS) {
                let total = block.iter().sum::<f64>();
                assert_relative_eq!(total, 200.0, epsilon = 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_translation_invariance() -> Result<(), FeatureError> {
        let method = NormalEstimation::default();
        let a = estimate_normals(&helix(150, [0.0; 3]), &method);
        let b = estimate_normals(&helix(150, [10.0, -4.0, 2.5]), &method);
        let search = FeatureSearch {
            radius: 2.0,
            max_nn: 90,
        };
        let fa = compute_fpfh_features(&a, &search)?;
        let fb = compute_fpfh_features(&b, &search)?;
        for (x, y) in fa.iter().zip(fb.iter()) {
            assert!(descriptor_distance2(x, y) < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_missing_normals() {
        let search = FeatureSearch {
            radius: 1.0,
            max_nn: 10,
        };
        assert_eq!(
            compute_fpfh_features(&helix(10, [0.0; 3]), &search),
            Err(FeatureError::MissingNormals)
        );
        let cloud = helix(10, [0.0; 3]).with_normals(vec![[0.0, 1.0, 0.0]; 3]);
        assert_eq!(
            compute_fpfh_features(&cloud, &search),
            Err(FeatureError::NormalsLengthMismatch(3, 10))
        );
    }
}
