use std::collections::BTreeMap;

use crate::pointcloud::PointCloud;

/// Error type for the voxel grid.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VoxelGridError {
    /// The leaf size must be a positive finite number.
    #[error("Leaf size must be positive, got {0}")]
    InvalidLeafSize(f64),
}

/// Running sums of the points falling into one voxel.
#[derive(Default)]
struct VoxelData {
    point_sum: [f64; 3],
    normal_sum: [f64; 3],
    count: usize,
}

/// A 3D voxel grid for downsampling point clouds.
///
/// The grid is anchored half a voxel below the minimum bound of the cloud, so
/// translating a cloud translates its downsampled version by the same amount.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// The size of the cubic voxel (leaf).
    leaf_size: f64,
}

impl VoxelGrid {
    /// Creates a new `VoxelGrid` with the specified leaf size.
    pub fn new(leaf_size: f64) -> Result<Self, VoxelGridError> {
        if !(leaf_size > 0.0) || !leaf_size.is_finite() {
            return Err(VoxelGridError::InvalidLeafSize(leaf_size));
        }
        Ok(VoxelGrid { leaf_size })
    }

    /// Gets the voxel grid leaf size.
    pub fn leaf_size(&self) -> f64 {
        self.leaf_size
    }

    /// Computes the voxel index of a point relative to the grid origin.
    pub fn voxel_index(&self, origin: &[f64; 3], point: &[f64; 3]) -> [i64; 3] {
        std::array::from_fn(|k| ((point[k] - origin[k]) / self.leaf_size).floor() as i64)
    }

    /// Downsamples the input point cloud by replacing the points of each voxel
    /// with their centroid. Normals, when present, are averaged and
    /// re-normalized.
    ///
    /// Voxels are emitted in increasing index order, so the output is
    /// deterministic.
    pub fn downsample(&self, point_cloud: &PointCloud) -> PointCloud {
        if point_cloud.is_empty() {
            return PointCloud::default();
        }

        let min_bound = point_cloud.get_min_bound();
        let origin = min_bound.map(|v| v - 0.5 * self.leaf_size);

        let mut grid: BTreeMap<[i64; 3], VoxelData> = BTreeMap::new();
        let normals = point_cloud.normals();
        for (i, point) in point_cloud.points().iter().enumerate() {
            let entry = grid.entry(self.voxel_index(&origin, point)).or_default();
            for k in 0..3 {
                entry.point_sum[k] += point[k];
            }
            if let Some(normal) = normals.and_then(|n| n.get(i)) {
                for k in 0..3 {
                    entry.normal_sum[k] += normal[k];
                }
            }
            entry.count += 1;
        }

        let mut points = Vec::with_capacity(grid.len());
        let mut out_normals = normals.map(|_| Vec::with_capacity(grid.len()));
        for voxel in grid.values() {
            let inv_count = 1.0 / voxel.count as f64;
            points.push(voxel.point_sum.map(|v| v * inv_count));

            if let Some(ref mut normals_vec) = out_normals {
                let n = voxel.normal_sum;
                let norm = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                if norm > 0.0 {
                    normals_vec.push(n.map(|v| v / norm));
                } else {
                    normals_vec.push(n);
                }
            }
        }

        PointCloud::new(points, out_normals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_points_only() -> Result<(), VoxelGridError> {
        let point_cloud = PointCloud::from_points(vec![[1.0, 1.0, 1.0], [1.1, 1.1, 1.1]]);
        let voxel_grid = VoxelGrid::new(1.0)?;

        let downsampled = voxel_grid.downsample(&point_cloud);
        assert_eq!(downsampled.len(), 1);
        let centroid = downsampled.points()[0];
        assert!((centroid[0] - 1.05).abs() < 1e-12);
        assert!((centroid[1] - 1.05).abs() < 1e-12);
        assert!((centroid[2] - 1.05).abs() < 1e-12);
        assert!(downsampled.normals().is_none());
        Ok(())
    }

    #[test]
    fn test_downsample_with_normals() -> Result<(), VoxelGridError> {
        let points = vec![[1.0, 1.0, 1.0], [1.1, 1.1, 1.1], [4.0, 4.0, 4.0]];
        let normals = vec![[0.0, 2.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
        let point_cloud = PointCloud::new(points, Some(normals));
        let downsampled = VoxelGrid::new(1.0)?.downsample(&point_cloud);
        assert_eq!(downsampled.len(), 2);
        assert_eq!(
            downsampled.normals(),
            Some(&[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]][..])
        );
        Ok(())
    }

    #[test]
    fn test_translation_invariance() -> Result<(), VoxelGridError> {
        let points = (0..50)
            .map(|i| {
                let t = i as f64 * 0.37;
                [t.sin() * 3.0, t.cos() * 2.0, t]
            })
            .collect::<Vec<_>>();
        let shift = [4.0, -2.0, 8.0];
        let shifted = points
            .iter()
            .map(|p| [p[0] + shift[0], p[1] + shift[1], p[2] + shift[2]])
            .collect::<Vec<_>>();

        let grid = VoxelGrid::new(0.75)?;
        let a = grid.downsample(&PointCloud::from_points(points));
        let b = grid.downsample(&PointCloud::from_points(shifted));
        assert_eq!(a.len(), b.len());
        for (p, q) in a.points().iter().zip(b.points()) {
            for k in 0..3 {
                assert!((p[k] + shift[k] - q[k]).abs() < 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_invalid_leaf_size() {
        assert_eq!(
            VoxelGrid::new(0.0).err(),
            Some(VoxelGridError::InvalidLeafSize(0.0))
        );
        assert!(VoxelGrid::new(f64::NAN).is_err());
        assert!(VoxelGrid::new(f64::INFINITY).is_err());
    }
}
