/// A point cloud with points and optional per-point normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The normals of the points, parallel to `points`.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points and optional normals.
    pub fn new(points: Vec<[f64; 3]>, normals: Option<Vec<[f64; 3]>>) -> Self {
        Self { points, normals }
    }

    /// Create a point cloud without normals.
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        Self::new(points, None)
    }

    /// Replace the normals of the point cloud.
    pub fn with_normals(self, normals: Vec<[f64; 3]>) -> Self {
        Self {
            points: self.points,
            normals: Some(normals),
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<[f64; 3]> {
        self.points
    }

    /// Keep only the points at the given indices, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            points: indices.iter().map(|&i| self.points[i]).collect(),
            normals: self
                .normals
                .as_ref()
                .map(|normals| indices.iter().map(|&i| normals[i]).collect()),
        }
    }

    /// Get the minimum bound of the point cloud, `[0, 0, 0]` if empty.
    pub fn get_min_bound(&self) -> [f64; 3] {
        fold_bound(&self.points, f64::min)
    }

    /// Get the maximum bound of the point cloud, `[0, 0, 0]` if empty.
    pub fn get_max_bound(&self) -> [f64; 3] {
        fold_bound(&self.points, f64::max)
    }

    /// Check that every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.points.iter().flatten().all(|v| v.is_finite())
    }
}

/// Component-wise fold of a slice of points, `[0, 0, 0]` if empty.
pub(crate) fn fold_bound(points: &[[f64; 3]], f: fn(f64, f64) -> f64) -> [f64; 3] {
    match points.first() {
        None => [0.0; 3],
        Some(first) => points.iter().fold(*first, |acc, p| {
            [f(acc[0], p[0]), f(acc[1], p[1]), f(acc[2], p[2])]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            Some(vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
        );

        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points().len(), 2);

        if let Some(normals) = pointcloud.normals() {
            assert_eq!(normals.len(), 2);
        }

        if let Some(p1) = pointcloud.points().last() {
            assert_eq!(*p1, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_pointcloud_bounds() {
        let pointcloud = PointCloud::from_points(vec![[0.0, 2.0, -1.0], [1.0, -3.0, 4.0]]);
        assert_eq!(pointcloud.get_min_bound(), [0.0, -3.0, -1.0]);
        assert_eq!(pointcloud.get_max_bound(), [1.0, 2.0, 4.0]);
        assert_eq!(PointCloud::default().get_min_bound(), [0.0; 3]);
    }

    #[test]
    fn test_pointcloud_select() {
        let pointcloud = PointCloud::from_points(vec![[0.0; 3], [1.0; 3], [2.0; 3]])
            .with_normals(vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        let selected = pointcloud.select(&[2, 0]);
        assert_eq!(selected.points(), &[[2.0; 3], [0.0; 3]]);
        assert_eq!(
            selected.normals(),
            Some(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]][..])
        );
    }

    #[test]
    fn test_pointcloud_finite() {
        assert!(PointCloud::from_points(vec![[1.0, 2.0, 3.0]]).is_finite());
        assert!(!PointCloud::from_points(vec![[1.0, f64::NAN, 3.0]]).is_finite());
    }
}
