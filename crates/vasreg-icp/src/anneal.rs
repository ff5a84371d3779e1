use vasreg_3d::{kdtree::PointIndex, pointcloud::PointCloud, transforms::AffineTransform};

use crate::{icp_vanilla::icp_with_index, IcpConvergenceCriteria, IcpError, IcpResult};

/// A schedule of shrinking correspondence thresholds.
///
/// Step `i` of `N` uses `high * f + low * (1 - f)` with `f = ((N - i) / N)^3`,
/// so the threshold starts at `high` and decays quickly towards `low`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealSchedule {
    high: f64,
    low: f64,
    steps: usize,
    criteria: IcpConvergenceCriteria,
}

impl AnnealSchedule {
    /// Create a schedule going from `high` to `low` in `steps` steps.
    pub fn new(high: f64, low: f64, steps: usize) -> Result<Self, IcpError> {
        if steps == 0 {
            return Err(IcpError::InvalidSchedule);
        }
        for bound in [high, low] {
            if !(bound > 0.0) || !bound.is_finite() {
                return Err(IcpError::InvalidThreshold(bound));
            }
        }
        Ok(Self {
            high,
            low,
            steps,
            criteria: IcpConvergenceCriteria::default(),
        })
    }

    /// Set the maximum number of ICP iterations per step.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.criteria.max_iterations = max_iterations;
        self
    }

    /// Set the convergence criteria of every step.
    pub fn with_criteria(mut self, criteria: IcpConvergenceCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// The convergence criteria of every step.
    pub fn criteria(&self) -> &IcpConvergenceCriteria {
        &self.criteria
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps
    }

    /// Always `false`, a schedule has at least one step.
    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    /// Threshold used at step `i`.
    pub fn threshold(&self, i: usize) -> f64 {
        let n = self.steps as f64;
        let f = ((n - i as f64) / n).powi(3);
        self.high * f + self.low * (1.0 - f)
    }

    /// The `(threshold, max_iterations)` pairs of every step.
    pub fn steps(&self) -> Vec<(f64, usize)> {
        (0..self.steps)
            .map(|i| (self.threshold(i), self.criteria.max_iterations))
            .collect()
    }
}

/// Run ICP over every step of the schedule, each step seeded with the result
/// of the previous one.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud.
/// * `initial` - Initial transformation, identity when `None`.
/// * `schedule` - Thresholds and per-step convergence criteria.
///
/// # Returns
///
/// The result of the last step, with `num_iterations` summed over all steps.
pub fn icp_annealed(
    source: &PointCloud,
    target: &PointCloud,
    initial: Option<&AffineTransform>,
    schedule: &AnnealSchedule,
) -> Result<IcpResult, IcpError> {
    if source.is_empty() || target.is_empty() {
        return Err(IcpError::EmptyInput(source.len(), target.len()));
    }

    let index = PointIndex::new(target.points());
    let mut transform = initial.copied().unwrap_or_default();
    let mut result = IcpResult {
        transform,
        fitness: 0.0,
        inlier_rmse: 0.0,
        num_iterations: 0,
    };

    for (i, (threshold, _)) in schedule.steps().into_iter().enumerate() {
        let step = icp_with_index(
            source,
            target,
            &index,
            &transform,
            threshold,
            schedule.criteria(),
        )?;
        log::debug!(
            "anneal step {}/{}: threshold {:.4}, fitness {:.6}, inlier rmse {:.6}, iterations {}",
            i + 1,
            schedule.len(),
            threshold,
            step.fitness,
            step.inlier_rmse,
            step.num_iterations
        );
        transform = step.transform;
        result = IcpResult {
            num_iterations: result.num_iterations + step.num_iterations,
            ..step
        };
    }

    Ok(result)
}
