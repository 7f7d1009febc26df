//! Per-chunk reduction: dense distances, then the M nearest per treatment row.

use ndarray::ArrayView2;

use crate::distance::Kernel;
use crate::partition::Chunk;
use crate::select::{Candidate, select_k_smallest};

/// Reusable buffers for [`reduce_chunk`].
///
/// The distance buffer is sized `n_treatment × chunk_rows`, never
/// `n_treatment × n_pool`. Buffers grow as needed and never shrink.
#[derive(Debug, Clone, Default)]
pub struct ChunkScratch {
    /// Dense distance submatrix, row-major.
    pub(crate) dists: Vec<f64>,
    /// Candidates of one treatment row before selection.
    pub(crate) row: Vec<Candidate>,
}

impl ChunkScratch {
    /// Creates scratch buffers for `n_treatment` rows and chunks of up to
    /// `chunk_size` rows.
    pub fn new(n_treatment: usize, chunk_size: usize) -> Self {
        Self {
            dists: Vec::with_capacity(n_treatment.saturating_mul(chunk_size)),
            row: Vec::with_capacity(chunk_size),
        }
    }
}

/// The `m` nearest candidates of one chunk for every treatment row.
#[derive(Debug, Clone)]
pub struct ChunkCandidates {
    m: usize,
    candidates: Vec<Candidate>,
}

impl ChunkCandidates {
    /// Candidates retained per treatment row.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of treatment rows covered.
    pub fn n_treatment(&self) -> usize {
        if self.m == 0 {
            0
        } else {
            self.candidates.len() / self.m
        }
    }

    /// Retained candidates of treatment row `i`, in unspecified order.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.n_treatment()` while `m > 0`.
    pub fn row(&self, i: usize) -> &[Candidate] {
        &self.candidates[i * self.m..(i + 1) * self.m]
    }
}

/// Number of candidates to retain from one chunk: `min(k, chunk_size, chunk_rows)`.
///
/// Keeping `min(k, ·)` per chunk can never drop a global top-k member, and a
/// short chunk keeps everything.
pub fn chunk_retain_count(k: usize, chunk_size: usize, chunk_rows: usize) -> usize {
    k.min(chunk_size).min(chunk_rows)
}

/// Computes treatment × chunk distances and keeps the `m` nearest chunk rows
/// per treatment row.
///
/// Candidates carry absolute comparison-pool row indices (`chunk.start() + j`).
pub(crate) fn reduce_chunk(
    treatment: ArrayView2<'_, f64>,
    chunk: &Chunk<'_>,
    kernel: &Kernel,
    m: usize,
    scratch: &mut ChunkScratch,
) -> ChunkCandidates {
    let n_t = treatment.nrows();
    let c = chunk.len();
    debug_assert!(m <= c);

    scratch.dists.clear();
    scratch.dists.resize(n_t * c, 0.0);
    kernel.pairwise(treatment, chunk.view(), &mut scratch.dists);

    let mut candidates = Vec::with_capacity(n_t * m);
    if c == 0 || m == 0 {
        return ChunkCandidates { m, candidates };
    }

    let start = chunk.start();
    for row_dists in scratch.dists.chunks_exact(c) {
        scratch.row.clear();
        scratch.row.extend(
            row_dists
                .iter()
                .enumerate()
                .map(|(j, &d)| Candidate::new(start + j, d)),
        );
        select_k_smallest(&mut scratch.row, m);
        candidates.extend_from_slice(&scratch.row);
    }

    ChunkCandidates { m, candidates }
}
