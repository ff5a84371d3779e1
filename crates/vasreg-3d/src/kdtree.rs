use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

/// A static k-d tree over the points of a cloud.
///
/// Distances returned by the queries are squared Euclidean distances.
pub struct PointIndex {
    tree: Option<ImmutableKdTree<f64, u32, 3, 32>>,
}

impl PointIndex {
    /// Build the index from a slice of points. An empty slice yields an index
    /// that answers every query with no result.
    pub fn new(points: &[[f64; 3]]) -> Self {
        let tree = (!points.is_empty()).then(|| ImmutableKdTree::new_from_slice(points));
        Self { tree }
    }

    /// Nearest point as `(index, squared_distance)`.
    pub fn nearest(&self, query: &[f64; 3]) -> Option<(usize, f64)> {
        self.tree.as_ref().map(|tree| {
            let nn = tree.nearest_one::<SquaredEuclidean>(query);
            (nn.item as usize, nn.distance)
        })
    }

    /// Nearest point within `radius` as `(index, squared_distance)`.
    pub fn nearest_within(&self, query: &[f64; 3], radius: f64) -> Option<(usize, f64)> {
        self.nearest(query)
            .filter(|(_, dist2)| *dist2 <= radius * radius)
    }

    /// Hybrid search: the at most `max_nn` closest points within `radius`,
    /// sorted by increasing distance. The query point itself is included when
    /// it belongs to the index.
    pub fn search_hybrid(&self, query: &[f64; 3], radius: f64, max_nn: usize) -> Vec<(usize, f64)> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        let mut neighbors = tree
            .within::<SquaredEuclidean>(query, radius * radius)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance))
            .collect::<Vec<_>>();
        // ties are broken by index so that the truncation is deterministic
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        neighbors.truncate(max_nn);
        neighbors
    }
}
