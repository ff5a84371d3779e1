//! Poisson-disk subsampling of point clouds.
//!
//! Implements the parallel pruning scheme of Corsini et al., "Efficient and
//! Flexible Sampling with Blue Noise Properties of Triangular Meshes" /
//! "Parallel Poisson Disk Sampling with Spectrum Analysis on Surfaces":
//!
//! * the bounding box is covered by a uniform grid with cell size `r / √3`, so
//!   a cell can hold at most one sample;
//! * cells are split into 27 phase groups by `(ix mod 3, iy mod 3, iz mod 3)`.
//!   Two cells of the same group are more than `r` apart, so the cells of a
//!   group are processed concurrently without conflicts;
//! * inside a cell the candidates are visited in a seeded random order and the
//!   first one at distance `>= r` from every accepted sample is kept.

use std::collections::{BTreeMap, HashMap};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;

use crate::{
    ops::squared_distance,
    pointcloud::{fold_bound, PointCloud},
};

type CellKey = [i64; 3];

/// Poisson-disk sampler with a minimum inter-sample distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonDiskSampler {
    radius: f64,
    seed: u64,
}

impl PoissonDiskSampler {
    /// Create a sampler for the given minimum distance with seed `0`.
    pub fn new(radius: f64) -> Self {
        Self { radius, seed: 0 }
    }

    /// Use a different seed for the candidate order.
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// The minimum distance between samples.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Indices of the retained points, in increasing order.
    ///
    /// A non-positive (or NaN) radius keeps every point.
    pub fn sample_indices(&self, points: &[[f64; 3]]) -> Vec<usize> {
        if !(self.radius > 0.0) || points.is_empty() {
            return (0..points.len()).collect();
        }

        let radius2 = self.radius * self.radius;
        let cell_size = self.radius / 3f64.sqrt();
        let min_bound = fold_bound(points, f64::min);

        let cell_of = |p: &[f64; 3]| -> CellKey {
            std::array::from_fn(|k| ((p[k] - min_bound[k]) / cell_size).floor() as i64)
        };

        let mut order = (0..points.len()).collect::<Vec<_>>();
        order.shuffle(&mut StdRng::seed_from_u64(self.seed));

        // candidates per cell, in shuffled order
        let mut cells: BTreeMap<CellKey, Vec<usize>> = BTreeMap::new();
        for &i in &order {
            cells.entry(cell_of(&points[i])).or_default().push(i);
        }

        let mut phases: Vec<Vec<(&CellKey, &Vec<usize>)>> = vec![Vec::new(); 27];
        for (key, candidates) in cells.iter() {
            let phase = key[0].rem_euclid(3) * 9 + key[1].rem_euclid(3) * 3 + key[2].rem_euclid(3);
            phases[phase as usize].push((key, candidates));
        }

        let mut samples: HashMap<CellKey, usize> = HashMap::new();
        for phase in phases.iter() {
            let accepted = phase
                .par_iter()
                .filter_map(|(key, candidates)| {
                    candidates
                        .iter()
                        .find(|&&i| is_far_from_samples(points, &samples, key, &points[i], radius2))
                        .map(|&i| (**key, i))
                })
                .collect::<Vec<_>>();
            samples.extend(accepted);
        }

        let mut kept = samples.into_values().collect::<Vec<_>>();
        kept.sort_unstable();

        log::debug!(
            "poisson disk sampling: kept {} of {} points (radius {})",
            kept.len(),
            points.len(),
            self.radius
        );

        kept
    }

    /// Subsample a point cloud, keeping the input order and normals.
    pub fn downsample(&self, cloud: &PointCloud) -> PointCloud {
        cloud.select(&self.sample_indices(cloud.points()))
    }
}

fn is_far_from_samples(
    points: &[[f64; 3]],
    samples: &HashMap<CellKey, usize>,
    key: &CellKey,
    p: &[f64; 3],
    radius2: f64,
) -> bool {
    for dx in -2..=2 {
        for dy in -2..=2 {
            for dz in -2..=2 {
                let neighbor = [key[0] + dx, key[1] + dy, key[2] + dz];
                if let Some(&j) = samples.get(&neighbor) {
                    if squared_distance(p, &points[j]) < radius2 {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Poisson-disk subsampling with the default seed.
///
/// Example:
///
/// ```
/// use vasreg_3d::{pointcloud::PointCloud, sampling::downsample_poisson_disk};
///
/// let cloud = PointCloud::from_points(vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [5.0, 0.0, 0.0]]);
/// let sampled = downsample_poisson_disk(&cloud, 1.0);
/// assert_eq!(sampled.len(), 2);
/// ```
pub fn downsample_poisson_disk(cloud: &PointCloud, radius: f64) -> PointCloud {
    PoissonDiskSampler::new(radius).downsample(cloud)
}
