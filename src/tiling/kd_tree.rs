use std::cmp::Ordering;

use tracing::debug;

use crate::error::{CityAtlasError, Result};
use crate::types::{CityObject, TileBucket};

/// Below this many objects both halves are split on the current thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// Bucket objects into tiles with a 2-D k-d tree over their centroids.
///
/// Splits at the median along x, then y, alternating, until no bucket holds more
/// than `max_per_tile` objects. Buckets come out in depth-first order (lower half
/// first) and are numbered from 0. The result does not depend on input order.
pub fn partition(mut objects: Vec<CityObject>, max_per_tile: usize) -> Result<Vec<TileBucket>> {
    if max_per_tile == 0 {
        return Err(CityAtlasError::Tiling(
            "max objects per tile must be at least 1".into(),
        ));
    }
    if objects.is_empty() {
        return Ok(Vec::new());
    }

    // Canonical order so equal centroids always break the same way.
    objects.sort_by(|a, b| a.id.cmp(&b.id));

    let groups = split(objects, 0, max_per_tile);
    let buckets: Vec<TileBucket> = groups
        .into_iter()
        .enumerate()
        .map(|(index, objects)| TileBucket { index, objects })
        .collect();

    debug!(tiles = buckets.len(), max_per_tile, "Partitioned objects");
    Ok(buckets)
}

fn split(mut objects: Vec<CityObject>, depth: usize, max_per_tile: usize) -> Vec<Vec<CityObject>> {
    if objects.len() <= max_per_tile {
        return vec![objects];
    }

    let axis = depth % 2;
    objects.sort_by(|a, b| by_axis(a, b, axis));
    let upper = objects.split_off(objects.len() / 2);

    let (mut lower, upper) = if objects.len() + upper.len() >= PARALLEL_THRESHOLD {
        rayon::join(
            || split(objects, depth + 1, max_per_tile),
            || split(upper, depth + 1, max_per_tile),
        )
    } else {
        (
            split(objects, depth + 1, max_per_tile),
            split(upper, depth + 1, max_per_tile),
        )
    };
    lower.extend(upper);
    lower
}

fn by_axis(a: &CityObject, b: &CityObject, axis: usize) -> Ordering {
    a.centroid()[axis]
        .total_cmp(&b.centroid()[axis])
        .then_with(|| a.id.cmp(&b.id))
}
