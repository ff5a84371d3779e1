use serde::{Deserialize, Serialize};
use vasreg_3d::{
    features::{compute_fpfh_features, FeatureSearch, FpfhDescriptor},
    normals::{estimate_normals, NormalEstimation, UP_VECTOR},
    pointcloud::PointCloud,
    voxel_grid::VoxelGrid,
};

use crate::{
    checker::DistanceChecker, correspondence::correspondences_from_features,
    ransac_based_on_correspondence, RansacConvergenceCriteria, RansacError, RansacResult,
};

/// Sample size of every RANSAC trial.
pub const RANSAC_N: usize = 3;

/// Normals assigned to the downsampled clouds before the feature extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalMode {
    /// Every point gets the `+y` up-vector.
    #[default]
    UpVector,
    /// Local PCA over a `2 * spacing` neighborhood of at most 30 points.
    LocalPca,
}

impl NormalMode {
    /// The normal estimation for a registration at `spacing`.
    pub fn estimation(&self, spacing: f64) -> NormalEstimation {
        match self {
            NormalMode::UpVector => NormalEstimation::Constant(UP_VECTOR),
            NormalMode::LocalPca => NormalEstimation::LocalPca {
                radius: 2.0 * spacing,
                max_nn: 30,
            },
        }
    }
}

/// Parameters of the feature-based global registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum number of RANSAC trials.
    pub max_iterations: usize,
    /// Confidence used by the early exit.
    pub confidence: f64,
    /// Neighbor budget of the features, the FPFH search keeps `3 * max_nn` points.
    pub max_nn: usize,
    /// Keep only the mutually nearest feature pairs.
    pub mutual_filter: bool,
    /// Normals assigned before the feature extraction.
    pub normals: NormalMode,
    /// Seed of the trial sampler.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            confidence: 0.999,
            max_nn: 30,
            mutual_filter: true,
            normals: NormalMode::UpVector,
            seed: 0,
        }
    }
}

impl RansacConfig {
    /// The stopping rule of the trial loop.
    pub fn criteria(&self) -> RansacConvergenceCriteria {
        RansacConvergenceCriteria {
            max_iterations: self.max_iterations,
            confidence: self.confidence,
        }
    }
}

/// Voxel downsampling, normals and features of one cloud.
fn preprocess(
    cloud: &PointCloud,
    spacing: f64,
    config: &RansacConfig,
) -> Result<(PointCloud, Vec<FpfhDescriptor>), RansacError> {
    let down = VoxelGrid::new(spacing)?.downsample(cloud);
    let down = estimate_normals(&down, &config.normals.estimation(spacing));
    let search = FeatureSearch {
        radius: 5.0 * spacing,
        max_nn: 3 * config.max_nn,
    };
    let features = compute_fpfh_features(&down, &search)?;
    Ok((down, features))
}

/// Coarse registration of `moving` onto `fixed` without an initial guess.
///
/// Both clouds are voxel-downsampled at `spacing`, described with FPFH
/// features, and the feature correspondences are fed to RANSAC with an inlier
/// distance of `1.5 * spacing`.
///
/// The fitness and the inliers of the result refer to the voxel-downsampled
/// clouds.
pub fn register_ransac(
    moving: &PointCloud,
    fixed: &PointCloud,
    spacing: f64,
    config: &RansacConfig,
) -> Result<RansacResult, RansacError> {
    if !(spacing > 0.0) || !spacing.is_finite() {
        return Err(RansacError::InvalidSpacing(spacing));
    }
    if moving.is_empty() || fixed.is_empty() {
        return Err(RansacError::EmptyInput(moving.len(), fixed.len()));
    }

    let (moving_down, moving_features) = preprocess(moving, spacing, config)?;
    let (fixed_down, fixed_features) = preprocess(fixed, spacing, config)?;

    let correspondences = correspondences_from_features(
        &moving_features,
        &fixed_features,
        config.mutual_filter,
        3 * RANSAC_N,
    );

    let max_distance = 1.5 * spacing;
    let result = ransac_based_on_correspondence(
        moving_down.points(),
        fixed_down.points(),
        &correspondences,
        max_distance,
        RANSAC_N,
        &DistanceChecker::new(max_distance),
        &config.criteria(),
        config.seed,
    )?;

    log::info!(
        "ransac: {} / {} voxels, {} correspondences, fitness {:.4}, inlier rmse {:.4}, {} trials",
        moving_down.len(),
        fixed_down.len(),
        correspondences.len(),
        result.fitness,
        result.inlier_rmse,
        result.num_iterations
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Points on a bent tube of radius 1.5, a crude vessel segment.
    fn create_tube() -> PointCloud {
        let mut points = Vec::new();
        for i in 0..120 {
            let t = i as f64 * 0.25;
            let center = [6.0 * (t * 0.2).cos(), t, 4.0 * (t * 0.13).sin()];
            for k in 0..12 {
                let a = k as f64 * std::f64::consts::TAU / 12.0;
                points.push([
                    center[0] + 1.5 * a.cos(),
                    center[1],
                    center[2] + 1.5 * a.sin(),
                ]);
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn test_register_translation() -> Result<(), RansacError> {
        let fixed = create_tube();
        let shift = [12.0, -7.0, 5.0];
        let moving = PointCloud::from_points(
            fixed
                .points()
                .iter()
                .map(|p| [p[0] - shift[0], p[1] - shift[1], p[2] - shift[2]])
                .collect(),
        );

        let result = register_ransac(&moving, &fixed, 1.0, &RansacConfig::default())?;
        assert!(result.fitness > 0.99);

        // the coarse transform lands within the inlier distance of the truth
        let n = moving.len() as f64;
        let centroid = moving
            .points()
            .iter()
            .fold([0.0; 3], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n, acc[2] + p[2] / n]);
        let moved = result.transform.transform_point(&centroid);
        let error = (0..3)
            .map(|k| (moved[k] - centroid[k] - shift[k]).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(error < 1.5, "centroid error {error}");
        assert_relative_eq!(result.transform.matrix[1][1], 1.0, epsilon = 0.05);
        Ok(())
    }

    /// Integer lattice points forming the shell of the bent tube, so that a
    /// quarter turn with an integer shift maps the cloud onto a lattice again.
    fn create_lattice_tube() -> PointCloud {
        let centers = (0..120)
            .map(|i| {
                let t = i as f64 * 0.25;
                [6.0 * (t * 0.2).cos(), t, 4.0 * (t * 0.13).sin()]
            })
            .collect::<Vec<_>>();
        let mut points = Vec::new();
        for z in -7..=7 {
            for y in -3..=33 {
                for x in -9..=9 {
                    let p = [x as f64, y as f64, z as f64];
                    let d = centers
                        .iter()
                        .map(|c| (0..3).map(|k| (p[k] - c[k]).powi(2)).sum::<f64>())
                        .fold(f64::INFINITY, f64::min)
                        .sqrt();
                    if (1.0..=2.5).contains(&d) {
                        points.push(p);
                    }
                }
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn test_register_rotation() -> Result<(), Box<dyn std::error::Error>> {
        // fixed = R moving + t, a quarter turn about the up-vector carried by the normals
        let rotation = [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]];
        let shift = [4.0, -3.0, 2.0];

        let fixed = create_lattice_tube();
        assert!(fixed.len() > 300);
        // moving = Rᵀ (p - t)
        let moving = PointCloud::from_points(
            fixed
                .points()
                .iter()
                .map(|p| {
                    let q = [p[0] - shift[0], p[1] - shift[1], p[2] - shift[2]];
                    std::array::from_fn(|i| (0..3).map(|k| rotation[k][i] * q[k]).sum::<f64>())
                })
                .collect(),
        );

        let result = register_ransac(&moving, &fixed, 1.0, &RansacConfig::default())?;
        assert!(result.fitness > 0.99, "fitness {}", result.fitness);

        // the global stage returns a proper rotation
        let r = result.transform.matrix;
        for i in 0..3 {
            for j in 0..3 {
                let rtr = (0..3).map(|k| r[k][i] * r[k][j]).sum::<f64>();
                assert_relative_eq!(rtr, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-9);
            }
        }
        let det = r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0]);
        assert_relative_eq!(det, 1.0, epsilon = 1e-9);

        // close to the truth, within the resolution of the coarse stage
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(r[i][j], rotation[i][j], epsilon = 0.1);
            }
        }
        let n = moving.len() as f64;
        let centroid = moving
            .points()
            .iter()
            .fold([0.0; 3], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n, acc[2] + p[2] / n]);
        let moved = result.transform.transform_point(&centroid);
        let error = (0..3)
            .map(|i| {
                let expected = (0..3).map(|k| rotation[i][k] * centroid[k]).sum::<f64>() + shift[i];
                (moved[i] - expected).powi(2)
            })
            .sum::<f64>()
            .sqrt();
        assert!(error < 1.5, "centroid error {error}");
        Ok(())
    }

    #[test]
    fn test_invalid_input() {
        let cloud = create_tube();
        let config = RansacConfig::default();
        assert_eq!(
            register_ransac(&cloud, &cloud, 0.0, &config),
            Err(RansacError::InvalidSpacing(0.0))
        );
        assert_eq!(
            register_ransac(&PointCloud::default(), &cloud, 1.0, &config),
            Err(RansacError::EmptyInput(0, cloud.len()))
        );
    }

    #[test]
    fn test_config_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config: RansacConfig = serde_json::from_str(r#"{"normals": "local_pca", "seed": 3}"#)?;
        assert_eq!(config.normals, NormalMode::LocalPca);
        assert_eq!(config.seed, 3);
        assert_eq!(config.max_iterations, 1_000_000);
        assert_eq!(
            config.normals.estimation(2.0),
            NormalEstimation::LocalPca {
                radius: 4.0,
                max_nn: 30
            }
        );
        Ok(())
    }
}
