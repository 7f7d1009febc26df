//! Matching entry points: validation, chunk loop, and result assembly.

use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::accumulate::CandidateAccumulator;
use crate::config::MatchConfig;
use crate::distance::Kernel;
use crate::error::MatchError;
use crate::features::FeatureMatrix;
use crate::partition::{Chunk, chunks, n_chunks};
use crate::reduce::{ChunkScratch, chunk_retain_count, reduce_chunk};
use crate::result::{Match, MatchResult, TreatmentMatches};
use crate::select::Candidate;

/// Validates config and shapes before any chunk is touched.
fn validate_inputs<Id>(
    treatment: &FeatureMatrix<Id>,
    pool: &FeatureMatrix<Id>,
    config: &MatchConfig,
) -> Result<(), MatchError> {
    // Config validation first
    config.validate()?;

    if treatment.is_empty() {
        return Err(MatchError::EmptyTreatment);
    }

    // A pool built from zero rows has width 0, which is unknown rather than
    // wrong; any other width must match.
    let pool_width_known = !pool.is_empty() || pool.n_features() > 0;
    if pool_width_known && treatment.n_features() != pool.n_features() {
        return Err(MatchError::FeatureDimensionMismatch {
            treatment: treatment.n_features(),
            comparison: pool.n_features(),
        });
    }

    Ok(())
}

/// Runs the chunk loop on the current thread, threading one accumulator through it.
fn accumulate_sequential(
    treatment: ArrayView2<'_, f64>,
    pool: ArrayView2<'_, f64>,
    kernel: &Kernel,
    k: usize,
    chunk_size: usize,
    scratch: &mut ChunkScratch,
) -> CandidateAccumulator {
    let mut acc = CandidateAccumulator::new(treatment.nrows(), k);
    for chunk in chunks(pool, chunk_size) {
        let m = chunk_retain_count(k, chunk_size, chunk.len());
        let reduced = reduce_chunk(treatment, &chunk, kernel, m, scratch);
        trace!(
            start = chunk.start(),
            rows = chunk.len(),
            m,
            "chunk reduced"
        );
        acc.absorb(&reduced);
    }
    acc
}

/// Runs the chunk loop on the rayon pool: one accumulator and scratch per
/// worker split, merged at the end.
fn accumulate_parallel(
    treatment: ArrayView2<'_, f64>,
    pool: ArrayView2<'_, f64>,
    kernel: &Kernel,
    k: usize,
    chunk_size: usize,
) -> CandidateAccumulator {
    let n_t = treatment.nrows();
    let scratch_rows = chunk_size.min(pool.nrows());
    let work: Vec<Chunk<'_>> = chunks(pool, chunk_size).collect();
    work.par_iter()
        .fold(
            || {
                (
                    CandidateAccumulator::new(n_t, k),
                    ChunkScratch::new(n_t, scratch_rows),
                )
            },
            |(mut acc, mut scratch), chunk| {
                let m = chunk_retain_count(k, chunk_size, chunk.len());
                acc.absorb(&reduce_chunk(treatment, chunk, kernel, m, &mut scratch));
                (acc, scratch)
            },
        )
        .map(|(acc, _)| acc)
        .reduce(
            || CandidateAccumulator::new(n_t, k),
            CandidateAccumulator::merge,
        )
}

/// Attaches identifiers to the final per-row candidates.
fn assemble<Id: Clone>(
    treatment: &FeatureMatrix<Id>,
    pool: &FeatureMatrix<Id>,
    per_row: Vec<Vec<Candidate>>,
) -> MatchResult<Id> {
    let rows = treatment
        .ids()
        .iter()
        .zip(per_row)
        .enumerate()
        .map(|(row, (id, candidates))| TreatmentMatches {
            id: id.clone(),
            row,
            matches: candidates
                .into_iter()
                .map(|c| Match {
                    id: pool.ids()[c.row].clone(),
                    row: c.row,
                    distance: c.distance,
                })
                .collect(),
        })
        .collect();
    MatchResult::new(rows)
}

/// Internal implementation that assumes all inputs are validated.
fn match_inner<Id: Clone>(
    treatment: &FeatureMatrix<Id>,
    pool: &FeatureMatrix<Id>,
    config: &MatchConfig,
    scratch: &mut ChunkScratch,
) -> MatchResult<Id> {
    let k = config.n_matches().resolve(pool.n_rows());
    let chunk_size = config.chunk_size();
    let kernel = Kernel::new(config.metric(), treatment.values(), pool.values());

    debug!(
        k,
        n_chunks = n_chunks(pool.n_rows(), chunk_size),
        parallel = config.parallel(),
        "matching"
    );

    let acc = if config.parallel() {
        accumulate_parallel(treatment.values(), pool.values(), &kernel, k, chunk_size)
    } else {
        accumulate_sequential(
            treatment.values(),
            pool.values(),
            &kernel,
            k,
            chunk_size,
            scratch,
        )
    };

    assemble(treatment, pool, acc.finish())
}

/// Finds the K nearest comparison-pool rows for every treatment row.
///
/// The pool is processed in chunks of `config.chunk_size()` rows, so no buffer
/// proportional to `n_treatment × n_pool` is ever allocated. The result is
/// exact and does not depend on the chunk size or on `config.parallel()`.
///
/// Ties at equal distance go to the lower comparison-pool row index. NaN
/// distances rank after all numbers but are kept.
///
/// # Errors
///
/// Returns [`MatchError`] if the configuration is invalid, the treatment
/// matrix is empty, or feature counts differ. An empty pool is not an error:
/// every treatment row then gets no matches.
///
/// # Example
///
/// ```
/// use gridmatch_knn::{DistanceMetric, FeatureMatrix, MatchConfig, MatchCount, match_treatment};
///
/// let treatment = FeatureMatrix::from_rows(vec!["t"], &[vec![0.0, 0.0]]).unwrap();
/// let pool = FeatureMatrix::from_rows(
///     vec!["a", "b", "c"],
///     &[vec![1.0, 0.0], vec![0.0, 5.0], vec![3.0, 4.0]],
/// )
/// .unwrap();
/// let config = MatchConfig::new(DistanceMetric::Euclidean)
///     .with_n_matches(MatchCount::Limit(2))
///     .with_chunk_size(2);
///
/// let result = match_treatment(&treatment, &pool, &config).unwrap();
/// let ids: Vec<_> = result.get(&"t").unwrap().iter().map(|m| m.id).collect();
/// assert_eq!(ids, vec!["a", "b"]);
/// ```
#[tracing::instrument(
    skip_all,
    fields(
        n_treatment = treatment.n_rows(),
        n_pool = pool.n_rows(),
        metric = %config.metric(),
        chunk_size = config.chunk_size(),
    )
)]
pub fn match_treatment<Id: Clone>(
    treatment: &FeatureMatrix<Id>,
    pool: &FeatureMatrix<Id>,
    config: &MatchConfig,
) -> Result<MatchResult<Id>, MatchError> {
    validate_inputs(treatment, pool, config)?;
    let mut scratch = if config.parallel() {
        ChunkScratch::default()
    } else {
        ChunkScratch::new(treatment.n_rows(), config.chunk_size().min(pool.n_rows()))
    };
    Ok(match_inner(treatment, pool, config, &mut scratch))
}

/// Same as [`match_treatment`], reusing caller-owned scratch buffers.
///
/// Useful when matching many treatment groups against the same pool. The
/// scratch is only used by the sequential path.
///
/// # Errors
///
/// Returns [`MatchError`] if inputs are invalid.
#[tracing::instrument(
    skip_all,
    fields(
        n_treatment = treatment.n_rows(),
        n_pool = pool.n_rows(),
        metric = %config.metric(),
        chunk_size = config.chunk_size(),
    )
)]
pub fn match_treatment_with_scratch<Id: Clone>(
    treatment: &FeatureMatrix<Id>,
    pool: &FeatureMatrix<Id>,
    config: &MatchConfig,
    scratch: &mut ChunkScratch,
) -> Result<MatchResult<Id>, MatchError> {
    validate_inputs(treatment, pool, config)?;
    Ok(match_inner(treatment, pool, config, scratch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchCount;
    use crate::distance::DistanceMetric;
    use approx::assert_abs_diff_eq;

    fn scenario() -> (FeatureMatrix<&'static str>, FeatureMatrix<&'static str>) {
        let t = FeatureMatrix::from_rows(vec!["t"], &[vec![0.0, 0.0]]).unwrap();
        let pool = FeatureMatrix::from_rows(
            vec!["a", "b", "c"],
            &[vec![1.0, 0.0], vec![0.0, 5.0], vec![3.0, 4.0]],
        )
        .unwrap();
        (t, pool)
    }

    #[test]
    fn test_three_row_scenario() {
        let (t, pool) = scenario();
        let config = MatchConfig::new(DistanceMetric::Euclidean)
            .with_n_matches(MatchCount::Limit(2))
            .with_chunk_size(2);
        let result = match_treatment(&t, &pool, &config).unwrap();
        let matches = result.get(&"t").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert_abs_diff_eq!(matches[0].distance, 1.0, epsilon = 1e-12);
        // "b" and "c" tie at 5.0; the lower pool row ("b") wins.
        assert_eq!(matches[1].id, "b");
        assert_abs_diff_eq!(matches[1].distance, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_sentinel() {
        let (t, pool) = scenario();
        let config = MatchConfig::default()
            .with_n_matches(MatchCount::All)
            .with_chunk_size(1);
        let result = match_treatment(&t, &pool, &config).unwrap();
        let ids: Vec<_> = result.get(&"t").unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_scratch_matches_allocating() {
        let (t, pool) = scenario();
        let config = MatchConfig::default().with_chunk_size(2);
        let r1 = match_treatment(&t, &pool, &config).unwrap();
        let mut scratch = ChunkScratch::default();
        let r2 = match_treatment_with_scratch(&t, &pool, &config, &mut scratch).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ids: Vec<usize> = (0..300).collect();
        let rows: Vec<Vec<f64>> = (0..300)
            .map(|i| vec![((i * 31) % 97) as f64, ((i * 17) % 53) as f64])
            .collect();
        let pool = FeatureMatrix::from_rows(ids, &rows).unwrap();
        let t = FeatureMatrix::from_rows(vec![1000, 1001], &[vec![10.0, 10.0], vec![50.0, 3.0]])
            .unwrap();

        let seq = MatchConfig::default()
            .with_n_matches(MatchCount::Limit(7))
            .with_chunk_size(13);
        let par = seq.clone().with_parallel(true);
        assert_eq!(
            match_treatment(&t, &pool, &seq).unwrap(),
            match_treatment(&t, &pool, &par).unwrap()
        );
    }

    #[test]
    fn test_parallel_chunk_larger_than_pool() {
        let (t, pool) = scenario();
        let seq = MatchConfig::default()
            .with_n_matches(MatchCount::Limit(2))
            .with_chunk_size(usize::MAX);
        let par = seq.clone().with_parallel(true);
        let r_seq = match_treatment(&t, &pool, &seq).unwrap();
        let r_par = match_treatment(&t, &pool, &par).unwrap();
        assert_eq!(r_seq.n_matches(), 2);
        assert_eq!(r_seq, r_par);
    }

    #[test]
    fn test_empty_pool() {
        let (t, _) = scenario();
        let pool = FeatureMatrix::<&str>::empty(2);
        let result = match_treatment(&t, &pool, &MatchConfig::default()).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.get(&"t").unwrap().is_empty());
    }

    #[test]
    fn test_error_empty_treatment() {
        let (_, pool) = scenario();
        let t = FeatureMatrix::<&str>::empty(2);
        let result = match_treatment(&t, &pool, &MatchConfig::default());
        assert!(matches!(result, Err(MatchError::EmptyTreatment)));
    }

    #[test]
    fn test_error_dimension_mismatch() {
        let (_, pool) = scenario();
        let t = FeatureMatrix::from_rows(vec!["t"], &[vec![0.0, 0.0, 0.0]]).unwrap();
        let result = match_treatment(&t, &pool, &MatchConfig::default());
        assert!(matches!(
            result,
            Err(MatchError::FeatureDimensionMismatch {
                treatment: 3,
                comparison: 2
            })
        ));
    }

    #[test]
    fn test_error_empty_pool_wrong_width() {
        let (t, _) = scenario();
        let pool = FeatureMatrix::<&str>::empty(4);
        let result = match_treatment(&t, &pool, &MatchConfig::default());
        assert!(matches!(
            result,
            Err(MatchError::FeatureDimensionMismatch {
                treatment: 2,
                comparison: 4
            })
        ));
    }

    #[test]
    fn test_empty_pool_of_unknown_width() {
        let (t, _) = scenario();
        let pool = FeatureMatrix::<&str>::from_rows(Vec::new(), &[]).unwrap();
        let result = match_treatment(&t, &pool, &MatchConfig::default()).unwrap();
        assert!(result.get(&"t").unwrap().is_empty());
    }

    #[test]
    fn test_error_config_checked_first() {
        // Empty treatment and mismatched widths would both fail later.
        let t = FeatureMatrix::<&str>::empty(2);
        let pool = FeatureMatrix::<&str>::empty(3);
        let config = MatchConfig::default().with_chunk_size(0);
        let result = match_treatment(&t, &pool, &config);
        assert!(matches!(result, Err(MatchError::InvalidChunkSize { size: 0 })));
    }
}
