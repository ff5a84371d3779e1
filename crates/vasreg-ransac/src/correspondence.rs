use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use rayon::prelude::*;
use vasreg_3d::features::{FpfhDescriptor, FPFH_DIM};

/// A `(source_index, target_index)` pair.
pub type Correspondence = (usize, usize);

/// Index of the nearest target descriptor (L2) for every source descriptor.
///
/// The target descriptors are stored in a k-d tree built once per call, the
/// queries run in parallel. Returns an empty vector when `target` is empty.
pub fn nearest_features(source: &[FpfhDescriptor], target: &[FpfhDescriptor]) -> Vec<usize> {
    if target.is_empty() {
        return Vec::new();
    }
    let tree: ImmutableKdTree<f64, u32, FPFH_DIM, 32> = ImmutableKdTree::new_from_slice(target);
    source
        .par_iter()
        .map(|f| tree.nearest_one::<SquaredEuclidean>(f).item as usize)
        .collect()
}

/// Correspondences between two descriptor sets.
///
/// Every source descriptor is paired with its nearest target descriptor. With
/// `mutual_filter`, only the pairs that are also nearest from the target side
/// are kept, unless fewer than `min_mutual` of them survive, in which case the
/// unfiltered pairs are returned.
pub fn correspondences_from_features(
    source: &[FpfhDescriptor],
    target: &[FpfhDescriptor],
    mutual_filter: bool,
    min_mutual: usize,
) -> Vec<Correspondence> {
    let source_to_target = nearest_features(source, target);
    let all = source_to_target
        .iter()
        .enumerate()
        .map(|(i, &j)| (i, j))
        .collect::<Vec<_>>();

    if !mutual_filter {
        return all;
    }

    let target_to_source = nearest_features(target, source);
    let mutual = all
        .iter()
        .copied()
        .filter(|&(i, j)| target_to_source[j] == i)
        .collect::<Vec<_>>();

    if mutual.len() >= min_mutual {
        log::debug!("mutual filter kept {} of {} correspondences", mutual.len(), all.len());
        mutual
    } else {
        log::warn!(
            "too few mutual correspondences ({} < {}), using all {} correspondences",
            mutual.len(),
            min_mutual,
            all.len()
        );
        all
    }
}
