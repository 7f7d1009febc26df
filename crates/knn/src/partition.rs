//! Splitting the comparison pool into bounded, contiguous row chunks.

use std::ops::Range;

use ndarray::{ArrayView2, s};

/// A contiguous row range of the comparison pool.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    start: usize,
    view: ArrayView2<'a, f64>,
}

impl<'a> Chunk<'a> {
    /// Absolute row range covered in the source matrix.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.view.nrows()
    }

    /// First absolute row index.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of rows in this chunk.
    pub fn len(&self) -> usize {
        self.view.nrows()
    }

    /// Returns `true` if the chunk has no rows.
    pub fn is_empty(&self) -> bool {
        self.view.nrows() == 0
    }

    /// The rows of this chunk.
    pub fn view(&self) -> ArrayView2<'a, f64> {
        self.view
    }
}

/// Lazy iterator over the chunks of a matrix, in row order.
///
/// Created by [`chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    values: ArrayView2<'a, f64>,
    chunk_size: usize,
    next_start: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let n_rows = self.values.nrows();
        if self.next_start >= n_rows {
            return None;
        }
        let start = self.next_start;
        let end = (start + self.chunk_size).min(n_rows);
        self.next_start = end;
        Some(Chunk {
            start,
            view: self.values.slice_move(s![start..end, ..]),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = n_chunks(
            self.values.nrows().saturating_sub(self.next_start),
            self.chunk_size,
        );
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Splits `values` into chunks of at most `chunk_size` rows.
///
/// Every row is covered exactly once, in input order; all chunks have
/// `chunk_size` rows except possibly the last. A matrix without rows yields no
/// chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero. Callers validate it through
/// [`MatchConfig::validate`](crate::MatchConfig::validate).
pub fn chunks(values: ArrayView2<'_, f64>, chunk_size: usize) -> Chunks<'_> {
    assert!(chunk_size > 0, "chunks: chunk_size must be >= 1");
    Chunks {
        values,
        chunk_size,
        next_start: 0,
    }
}

/// Number of chunks needed to cover `n_rows` rows: `ceil(n_rows / chunk_size)`.
///
/// Returns 0 when `chunk_size` is zero.
pub fn n_chunks(n_rows: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    n_rows.div_ceil(chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn pool(n_rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_rows, 2), |(i, j)| (i * 10 + j) as f64)
    }

    #[test]
    fn test_uneven_last_chunk() {
        let m = pool(7);
        let ranges: Vec<_> = chunks(m.view(), 3).map(|c| c.range()).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn test_even_division() {
        let m = pool(6);
        let lens: Vec<_> = chunks(m.view(), 2).map(|c| c.len()).collect();
        assert_eq!(lens, vec![2, 2, 2]);
    }

    #[test]
    fn test_chunk_larger_than_pool() {
        let m = pool(4);
        let all: Vec<_> = chunks(m.view(), 100).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].range(), 0..4);
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let m = pool(0);
        assert_eq!(chunks(m.view(), 5).count(), 0);
    }

    #[test]
    fn test_chunk_views_match_source_rows() {
        let m = pool(5);
        for chunk in chunks(m.view(), 2) {
            for (local, abs) in chunk.range().enumerate() {
                assert_eq!(chunk.view().row(local), m.row(abs));
            }
        }
    }

    #[test]
    fn test_size_hint_exact() {
        let m = pool(10);
        let mut it = chunks(m.view(), 4);
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
        it.next();
        it.next();
        assert_eq!(it.len(), 0);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_n_chunks() {
        assert_eq!(n_chunks(0, 3), 0);
        assert_eq!(n_chunks(1, 3), 1);
        assert_eq!(n_chunks(3, 3), 1);
        assert_eq!(n_chunks(4, 3), 2);
        assert_eq!(n_chunks(5, 0), 0);
    }

    #[test]
    #[should_panic(expected = "chunk_size must be >= 1")]
    fn test_zero_chunk_size_panics() {
        let m = pool(3);
        let _ = chunks(m.view(), 0);
    }
}
