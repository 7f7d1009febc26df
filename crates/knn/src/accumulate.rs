//! Global reduction: merges per-chunk candidates into the exact top-k.

use crate::reduce::ChunkCandidates;
use crate::select::{Candidate, select_k_smallest, sort_candidates};

/// Running per-treatment-row candidate lists across chunks.
///
/// Owned by one chunk loop (or one rayon worker) and passed along explicitly;
/// accumulators over disjoint chunks combine with [`merge`](Self::merge).
#[derive(Debug, Clone)]
pub struct CandidateAccumulator {
    k: usize,
    rows: Vec<Vec<Candidate>>,
}

impl CandidateAccumulator {
    /// Creates an empty accumulator for `n_treatment` rows keeping `k` matches each.
    pub fn new(n_treatment: usize, k: usize) -> Self {
        Self {
            k,
            rows: vec![Vec::new(); n_treatment],
        }
    }

    /// Number of treatment rows.
    pub fn n_treatment(&self) -> usize {
        self.rows.len()
    }

    /// Number of candidates currently held for treatment row `i`.
    pub fn held(&self, i: usize) -> usize {
        self.rows[i].len()
    }

    /// Appends one chunk's candidates.
    ///
    /// A row that reaches `2k` candidates is compacted back to `k`. Under the
    /// strict candidate order a dropped candidate is beaten by `k` survivors, so
    /// compaction never changes the final answer.
    pub fn absorb(&mut self, chunk: &ChunkCandidates) {
        if chunk.m() == 0 {
            return;
        }
        let k = self.k;
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.extend_from_slice(chunk.row(i));
            if row.len() >= k.saturating_mul(2) {
                select_k_smallest(row, k);
            }
        }
    }

    /// Combines two accumulators built over disjoint sets of chunks.
    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.rows.len(), other.rows.len());
        let k = self.k;
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
            if row.len() >= k.saturating_mul(2) {
                select_k_smallest(row, k);
            }
        }
        self
    }

    /// Isolates the `k` nearest candidates per row and sorts only those,
    /// nearest first.
    pub fn finish(self) -> Vec<Vec<Candidate>> {
        let k = self.k;
        self.rows
            .into_iter()
            .map(|mut row| {
                select_k_smallest(&mut row, k);
                sort_candidates(&mut row);
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{DistanceMetric, Kernel};
    use crate::partition::chunks;
    use crate::reduce::{ChunkScratch, chunk_retain_count, reduce_chunk};
    use ndarray::{Array2, array};

    fn accumulate(
        t: &Array2<f64>,
        pool: &Array2<f64>,
        k: usize,
        chunk_size: usize,
    ) -> CandidateAccumulator {
        let kernel = Kernel::new(DistanceMetric::Euclidean, t.view(), pool.view());
        let mut scratch = ChunkScratch::new(t.nrows(), chunk_size);
        let mut acc = CandidateAccumulator::new(t.nrows(), k);
        for chunk in chunks(pool.view(), chunk_size) {
            let m = chunk_retain_count(k, chunk_size, chunk.len());
            acc.absorb(&reduce_chunk(t.view(), &chunk, &kernel, m, &mut scratch));
        }
        acc
    }

    #[test]
    fn test_finish_sorted_top_k() {
        let t = array![[0.0]];
        let pool = array![[5.0], [1.0], [4.0], [2.0], [3.0]];
        let out = accumulate(&t, &pool, 3, 2).finish();
        assert_eq!(
            out[0],
            vec![
                Candidate::new(1, 1.0),
                Candidate::new(3, 2.0),
                Candidate::new(4, 3.0)
            ]
        );
    }

    #[test]
    fn test_compaction_bounds_held_candidates() {
        let t = array![[0.0]];
        let pool = Array2::from_shape_fn((1000, 1), |(i, _)| (1000 - i) as f64);
        let acc = accumulate(&t, &pool, 3, 1);
        assert!(acc.held(0) < 6, "held {}", acc.held(0));
        let out = acc.finish();
        let rows: Vec<usize> = out[0].iter().map(|c| c.row).collect();
        assert_eq!(rows, vec![999, 998, 997]);
    }

    #[test]
    fn test_merge_equals_sequential() {
        let t = array![[0.0, 0.0], [3.0, 3.0]];
        let pool = Array2::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let whole = accumulate(&t, &pool, 4, 5).finish();

        let kernel = Kernel::new(DistanceMetric::Euclidean, t.view(), pool.view());
        let mut scratch = ChunkScratch::default();
        let mut left = CandidateAccumulator::new(2, 4);
        let mut right = CandidateAccumulator::new(2, 4);
        for chunk in chunks(pool.view(), 5) {
            let m = chunk_retain_count(4, 5, chunk.len());
            let reduced = reduce_chunk(t.view(), &chunk, &kernel, m, &mut scratch);
            if chunk.start() < 17 {
                left.absorb(&reduced);
            } else {
                right.absorb(&reduced);
            }
        }
        assert_eq!(right.merge(left).finish(), whole);
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let t = array![[0.0]];
        let pool = array![[2.0], [1.0]];
        let out = accumulate(&t, &pool, 5, 1).finish();
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[0][0].row, 1);
    }

    #[test]
    fn test_empty_accumulator() {
        let out = CandidateAccumulator::new(3, 2).finish();
        assert_eq!(out, vec![Vec::<Candidate>::new(); 3]);
    }
}
