use rand::{rngs::StdRng, seq::index::sample, SeedableRng};
use rayon::prelude::*;
use vasreg_3d::{kdtree::PointIndex, transforms::AffineTransform};
use vasreg_linalg::rigid::umeyama;

use crate::{checker::DistanceChecker, correspondence::Correspondence, RansacError};

/// Number of trials generated and evaluated together.
const TRIAL_BATCH_SIZE: usize = 64;

/// Stopping rule of the RANSAC loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacConvergenceCriteria {
    /// Maximum number of trials.
    pub max_iterations: usize,
    /// Desired probability of having drawn at least one all-inlier sample.
    pub confidence: f64,
}

impl Default for RansacConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            confidence: 0.999,
        }
    }
}

/// Result of the RANSAC registration.
///
/// The transformation is from the source to the target frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    /// Best transformation found.
    pub transform: AffineTransform,
    /// Fraction of source points with a target point within the distance threshold.
    pub fitness: f64,
    /// RMSE of the inlier pairs.
    pub inlier_rmse: f64,
    /// Number of trials evaluated.
    pub num_iterations: usize,
    /// Inlier pairs `(source, nearest target)` of the best transformation.
    pub inliers: Vec<Correspondence>,
}

/// Score of one trial.
#[derive(Debug, Clone, Copy)]
struct TrialScore {
    transform: AffineTransform,
    fitness: f64,
    inlier_rmse: f64,
}

impl TrialScore {
    fn is_better_than(&self, other: &Option<TrialScore>) -> bool {
        match other {
            None => self.fitness > 0.0,
            Some(best) => {
                self.fitness > best.fitness
                    || (self.fitness == best.fitness && self.inlier_rmse < best.inlier_rmse)
            }
        }
    }
}

/// Fitness and inlier RMSE of `transform` over the whole source cloud.
fn score_transform(
    source: &[[f64; 3]],
    index: &PointIndex,
    transform: &AffineTransform,
    max_distance: f64,
) -> (f64, f64) {
    let (count, error) = source.iter().fold((0usize, 0.0), |(count, error), p| {
        match index.nearest_within(&transform.transform_point(p), max_distance) {
            Some((_, d2)) => (count + 1, error + d2),
            None => (count, error),
        }
    });
    if count == 0 {
        return (0.0, 0.0);
    }
    (count as f64 / source.len() as f64, (error / count as f64).sqrt())
}

/// Number of trials needed to reach `confidence` given the current inlier ratio.
fn estimated_trials(fitness: f64, ransac_n: usize, confidence: f64, max_iterations: usize) -> usize {
    if fitness >= 1.0 {
        return 0;
    }
    let denominator = (1.0 - fitness.powi(ransac_n as i32)).ln();
    if denominator < 0.0 {
        ((1.0 - confidence).ln() / denominator) as usize
    } else {
        max_iterations
    }
}

/// Estimate a rigid transformation from putative correspondences with RANSAC.
///
/// Each trial draws `ransac_n` correspondences, fits a rigid transform to them,
/// prunes it with the checker and scores it by fitness, then inlier RMSE,
/// over the whole source cloud. Trials are drawn from a generator seeded with
/// `seed` and evaluated in batches, so the result only depends on the inputs.
///
/// # Arguments
///
/// * `source` - Source points.
/// * `target` - Target points.
/// * `correspondences` - Putative `(source, target)` pairs.
/// * `max_distance` - Inlier distance threshold.
/// * `ransac_n` - Sample size, at least 3.
/// * `checker` - Pruning test on the samples.
/// * `criteria` - Stopping rule.
/// * `seed` - Seed of the sample generator.
#[allow(clippy::too_many_arguments)]
pub fn ransac_based_on_correspondence(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    correspondences: &[Correspondence],
    max_distance: f64,
    ransac_n: usize,
    checker: &DistanceChecker,
    criteria: &RansacConvergenceCriteria,
    seed: u64,
) -> Result<RansacResult, RansacError> {
    if ransac_n < 3 {
        return Err(RansacError::InvalidParameter("ransac_n must be at least 3"));
    }
    if !(max_distance > 0.0) || !max_distance.is_finite() {
        return Err(RansacError::InvalidParameter("max_distance must be positive"));
    }
    if !(criteria.confidence > 0.0 && criteria.confidence < 1.0) {
        return Err(RansacError::InvalidParameter("confidence must be in (0, 1)"));
    }
    if source.is_empty() || target.is_empty() {
        return Err(RansacError::EmptyInput(source.len(), target.len()));
    }
    if correspondences.len() < ransac_n {
        return Err(RansacError::InsufficientCorrespondences(
            correspondences.len(),
            ransac_n,
        ));
    }

    let index = PointIndex::new(target);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut best: Option<TrialScore> = None;
    let mut limit = criteria.max_iterations;
    let mut num_trials = 0;

    while num_trials < limit {
        let batch_size = TRIAL_BATCH_SIZE.min(limit - num_trials);
        let samples = (0..batch_size)
            .map(|_| {
                sample(&mut rng, correspondences.len(), ransac_n)
                    .into_iter()
                    .map(|k| correspondences[k])
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let scores = samples
            .par_iter()
            .map(|sample| -> Result<Option<TrialScore>, RansacError> {
                let (src, dst): (Vec<_>, Vec<_>) =
                    sample.iter().map(|&(i, j)| (source[i], target[j])).unzip();
                let (rotation, translation, _) = umeyama(&src, &dst)?;
                let transform = AffineTransform::from_rotation_translation(rotation, translation);

                if !checker.check(source, target, sample, &transform) {
                    return Ok(None);
                }

                let (fitness, inlier_rmse) =
                    score_transform(source, &index, &transform, max_distance);
                Ok(Some(TrialScore {
                    transform,
                    fitness,
                    inlier_rmse,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // reduce in trial order, honoring the trial budget updated along the way
        for score in scores {
            if num_trials >= limit {
                break;
            }
            num_trials += 1;
            if let Some(score) = score {
                if score.is_better_than(&best) {
                    limit = limit.min(estimated_trials(
                        score.fitness,
                        ransac_n,
                        criteria.confidence,
                        criteria.max_iterations,
                    ));
                    best = Some(score);
                }
            }
        }

        log::debug!(
            "ransac: {} trials, best fitness {:.4}, trial budget {}",
            num_trials,
            best.map(|b| b.fitness).unwrap_or(0.0),
            limit
        );
    }

    let Some(best) = best else {
        return Err(RansacError::NoValidTransform(num_trials));
    };

    let inliers = source
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            index
                .nearest_within(&best.transform.transform_point(p), max_distance)
                .map(|(j, _)| (i, j))
        })
        .collect();

    Ok(RansacResult {
        transform: best.transform,
        fitness: best.fitness,
        inlier_rmse: best.inlier_rmse,
        num_iterations: num_trials,
        inliers,
    })
}
