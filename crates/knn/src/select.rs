//! Partial selection of the k nearest candidates.

use std::cmp::Ordering;

/// A comparison-pool row and its distance to one treatment row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Absolute row index in the comparison pool.
    pub row: usize,
    /// Distance to the treatment row.
    pub distance: f64,
}

impl Candidate {
    /// Creates a candidate.
    pub fn new(row: usize, distance: f64) -> Self {
        Self { row, distance }
    }
}

/// Total order on candidates: ascending distance, NaN after every number,
/// then lower comparison-pool row first.
///
/// Because no two candidates of one treatment row share a pool row, this
/// order is strict, which makes every selection below deterministic and
/// independent of the order candidates arrive in.
#[inline]
pub fn candidate_cmp(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .partial_cmp(&b.distance)
        .unwrap_or_else(|| a.distance.is_nan().cmp(&b.distance.is_nan()))
        .then(a.row.cmp(&b.row))
}

/// Keeps only the `k` smallest candidates, in unspecified order.
///
/// Runs in O(n) expected time via `select_nth_unstable_by`; the survivors are
/// not sorted. Does nothing if `k >= candidates.len()`.
pub fn select_k_smallest(candidates: &mut Vec<Candidate>, k: usize) {
    if k >= candidates.len() {
        return;
    }
    if k == 0 {
        candidates.clear();
        return;
    }
    candidates.select_nth_unstable_by(k - 1, candidate_cmp);
    candidates.truncate(k);
}

/// Sorts candidates nearest first.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_unstable_by(candidate_cmp);
}
