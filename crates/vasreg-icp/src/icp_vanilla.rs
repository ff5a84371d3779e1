use vasreg_3d::{
    kdtree::PointIndex, linalg::transform_points3d, pointcloud::PointCloud,
    transforms::AffineTransform,
};

use crate::{
    ops::{find_correspondences, fit_transformation},
    IcpError,
};

/// Result of the ICP algorithm.
///
/// The transformation is from the source to the target frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpResult {
    /// Estimated transformation.
    pub transform: AffineTransform,
    /// Fraction of source points with a target point within the threshold.
    pub fitness: f64,
    /// RMSE of the inlier correspondences.
    pub inlier_rmse: f64,
    /// The total number of iterations performed until convergence.
    pub num_iterations: usize,
}

/// Structure to define the ICP parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcpConvergenceCriteria {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Stop when the fitness changes less than this between two iterations.
    pub relative_fitness: f64,
    /// Stop when the inlier RMSE changes less than this between two iterations.
    pub relative_rmse: f64,
}

impl Default for IcpConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            relative_fitness: 1e-6,
            relative_rmse: 1e-6,
        }
    }
}

/// Iterative Closest Point (ICP) algorithm using point to point distance.
///
/// Only the pairs closer than `threshold` take part in the estimation.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud.
/// * `initial` - Initial transformation from the source to the target frame.
/// * `threshold` - Maximum correspondence distance.
/// * `criteria` - Convergence criteria.
///
/// # Returns
///
/// * `result` - Result of the ICP algorithm containing the transformation, the
///   alignment quality and the number of iterations.
pub fn icp_vanilla(
    source: &PointCloud,
    target: &PointCloud,
    initial: &AffineTransform,
    threshold: f64,
    criteria: &IcpConvergenceCriteria,
) -> Result<IcpResult, IcpError> {
    if source.is_empty() || target.is_empty() {
        return Err(IcpError::EmptyInput(source.len(), target.len()));
    }
    // build kdtree for target points to speed up the nearest neighbor search
    let index = PointIndex::new(target.points());
    icp_with_index(source, target, &index, initial, threshold, criteria)
}

/// ICP loop against a prebuilt index of the target points.
pub(crate) fn icp_with_index(
    source: &PointCloud,
    target: &PointCloud,
    index: &PointIndex,
    initial: &AffineTransform,
    threshold: f64,
    criteria: &IcpConvergenceCriteria,
) -> Result<IcpResult, IcpError> {
    if !(threshold > 0.0) || !threshold.is_finite() {
        return Err(IcpError::InvalidThreshold(threshold));
    }

    // perform transformation using the initial transformation
    let mut current_source = vec![[0.0; 3]; source.len()];
    transform_points3d(
        source.points(),
        &initial.matrix,
        &initial.translation,
        &mut current_source,
    )?;
    let mut next_source = vec![[0.0; 3]; source.len()];

    let mut correspondences =
        find_correspondences(&current_source, target.points(), index, threshold);
    let mut evaluation = correspondences.evaluation(source.len());

    let mut result = IcpResult {
        transform: *initial,
        fitness: evaluation.fitness,
        inlier_rmse: evaluation.inlier_rmse,
        num_iterations: 0,
    };

    // main icp loop
    for i in 0..criteria.max_iterations {
        // compute transformation between current source and closest points
        let delta = fit_transformation(&correspondences.source, &correspondences.target)?;

        // left-compose the update: T_new = T_delta * T_old
        result.transform = delta.compose(&result.transform);
        transform_points3d(
            &current_source,
            &delta.matrix,
            &delta.translation,
            &mut next_source,
        )?;
        std::mem::swap(&mut current_source, &mut next_source);

        let previous = evaluation;
        correspondences = find_correspondences(&current_source, target.points(), index, threshold);
        evaluation = correspondences.evaluation(source.len());

        result.fitness = evaluation.fitness;
        result.inlier_rmse = evaluation.inlier_rmse;
        result.num_iterations += 1;

        log::debug!(
            "Iteration {}: fitness {:.6}, inlier rmse {:.6}, correspondences {}",
            i,
            evaluation.fitness,
            evaluation.inlier_rmse,
            correspondences.source.len()
        );

        // check convergence and exit if below tolerance
        if (previous.fitness - evaluation.fitness).abs() < criteria.relative_fitness
            && (previous.inlier_rmse - evaluation.inlier_rmse).abs() < criteria.relative_rmse
        {
            log::debug!(
                "ICP converged in {} iterations with error {}",
                result.num_iterations,
                evaluation.inlier_rmse
            );
            break;
        }
    }

    Ok(result)
}
