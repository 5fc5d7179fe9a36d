use rand::{Rng, seq::index};

/// Draws `k` uniformly from `[0, max_objects)` and returns `k` distinct
/// region ids from `1..=rows*cols` in draw order. `k` is capped at the
/// number of regions.
pub fn select_regions<R>(rng: &mut R, max_objects: u32, rows: u32, cols: u32) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    let count = rows * cols;
    if max_objects == 0 || count == 0 {
        return Vec::new();
    }
    let k = rng.random_range(0..max_objects).min(count);
    index::sample(rng, count as usize, k as usize)
        .into_iter()
        .map(|i| i as u32 + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use std::collections::HashSet;

    #[test]
    fn regions_are_distinct_and_in_range() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..500 {
            let ids = select_regions(&mut rng, 10, 3, 3);
            assert!(ids.len() < 10);
            assert!(ids.iter().all(|&r| (1..=9).contains(&r)));
            let uniq: HashSet<_> = ids.iter().collect();
            assert_eq!(uniq.len(), ids.len());
        }
    }

    #[test]
    fn zero_max_is_empty() {
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..50 {
            assert!(select_regions(&mut rng, 0, 8, 8).is_empty());
        }
    }

    #[test]
    fn counts_cover_the_range() {
        let mut rng = SmallRng::seed_from_u64(5);
        let lens: HashSet<usize> = (0..400)
            .map(|_| select_regions(&mut rng, 4, 8, 8).len())
            .collect();
        assert_eq!(lens, HashSet::from([0, 1, 2, 3]));
    }
}
