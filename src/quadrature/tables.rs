//! Valid rule sizes and minimal sizes per harmonic degree.
//!
//! The accepted node counts are the Lebedev sizes from 6 to 5810. Each size
//! is realized by a banded Gauss rule with exactly that many nodes (see
//! [`GaussProductRule::with_size`](super::GaussProductRule::with_size)), so
//! the exact degree of a size follows from the node count alone.

/// Upper bound on the number of quadrature points.
pub const MAX_QUADRATURE_POINTS: usize = 5810;

/// Accepted rule sizes in ascending order.
pub const RULE_SIZES: [usize; 32] = [
    6, 14, 26, 38, 50, 74, 86, 110, 146, 170, 194, 230, 266, 302, 350, 434, 590, 770, 974, 1202,
    1454, 1730, 2030, 2354, 2702, 3074, 3470, 3890, 4334, 4802, 5294, 5810,
];

/// All valid rule sizes in ascending order.
pub fn valid_sizes() -> Vec<usize> {
    RULE_SIZES.to_vec()
}

/// Colatitude rings needed for exactness to degree `degree`.
#[inline]
pub const fn rings_for_degree(degree: usize) -> usize {
    (degree + 2) / 2
}

/// Highest polynomial degree a banded rule with `points` nodes integrates
/// exactly: the largest `d` whose `⌈(d+1)/2⌉` rings each hold `d + 1`
/// longitudes.
pub fn max_exact_degree(points: usize) -> usize {
    let mut degree = 0usize;
    while rings_for_degree(degree + 1) * (degree + 2) <= points {
        degree += 1;
    }
    degree
}

/// Valid size closest to `requested` (ties go to the smaller rule). Requests
/// above the largest rule map onto it.
pub fn snap_to_rule(requested: usize) -> usize {
    let mut best = RULE_SIZES[0];
    let mut best_gap = usize::MAX;
    for size in RULE_SIZES {
        let gap = size.abs_diff(requested);
        if gap < best_gap {
            best = size;
            best_gap = gap;
        }
    }
    best
}

/// Smallest valid size that integrates products of two degree-`degree`
/// harmonics exactly, capped at the largest rule.
pub fn minimal_points(degree: usize) -> usize {
    RULE_SIZES
        .iter()
        .copied()
        .find(|size| max_exact_degree(*size) >= 2 * degree)
        .unwrap_or(MAX_QUADRATURE_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_stay_under_cap() {
        let sizes = valid_sizes();
        assert_eq!(sizes[0], 6);
        assert_eq!(*sizes.last().unwrap(), MAX_QUADRATURE_POINTS);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn exact_degree_follows_node_count() {
        for (points, degree) in [
            (6, 2),
            (14, 3),
            (26, 5),
            (38, 7),
            (50, 9),
            (194, 18),
            (974, 43),
            (5810, 106),
        ] {
            assert_eq!(max_exact_degree(points), degree, "{points} points");
        }
    }

    #[test]
    fn snapping_picks_nearest_size() {
        assert_eq!(snap_to_rule(0), 6);
        assert_eq!(snap_to_rule(590), 590);
        assert_eq!(snap_to_rule(5810), 5810);
        assert_eq!(snap_to_rule(1000), 974);
        assert_eq!(snap_to_rule(100_000), 5810);
        // 50 and 74 are equally far from 62.
        assert_eq!(snap_to_rule(62), 50);
    }

    #[test]
    fn minimal_sets_grow_with_degree() {
        let mut last = 0;
        for degree in 0..80 {
            let n = minimal_points(degree);
            assert!(n >= last);
            assert!(RULE_SIZES.contains(&n));
            last = n;
        }
        assert_eq!(minimal_points(3), 38);
        assert_eq!(minimal_points(4), 50);
        assert_eq!(minimal_points(9), 194);
        assert_eq!(minimal_points(60), MAX_QUADRATURE_POINTS);
    }
}
