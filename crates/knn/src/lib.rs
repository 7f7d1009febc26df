//! Exact chunked K-nearest-neighbour matching.
//!
//! For every row of a small treatment matrix, this crate finds the K most
//! similar rows of a much larger comparison pool under a chosen distance
//! metric. The pool is scanned in bounded chunks, so peak memory stays at
//! `n_treatment × chunk_size` distances while the answer stays exact.
//!
//! | Stage | Work | Cost per treatment row |
//! |-------|------|------------------------|
//! | Partition | split pool into chunks of C rows | none |
//! | Per-chunk reduction | dense distances, keep `M = min(K, C)` nearest | O(C) expected |
//! | Global reduction | accumulate, keep K nearest, sort those K | O(K log K) final sort |
//!
//! # Quick start
//!
//! ```
//! use gridmatch_knn::{DistanceMetric, FeatureMatrix, MatchConfig, MatchCount, match_treatment};
//!
//! let treatment = FeatureMatrix::from_rows(vec!["t1"], &[vec![0.0, 0.0]]).unwrap();
//! let pool = FeatureMatrix::from_rows(
//!     vec!["a", "b", "c"],
//!     &[vec![1.0, 0.0], vec![0.0, 5.0], vec![3.0, 4.0]],
//! )
//! .unwrap();
//! let config = MatchConfig::new(DistanceMetric::Euclidean)
//!     .with_n_matches(MatchCount::Limit(2))
//!     .with_chunk_size(2);
//!
//! let result = match_treatment(&treatment, &pool, &config).unwrap();
//! assert_eq!(result.get(&"t1").unwrap().len(), 2);
//! ```
//!
//! # Architecture
//!
//! ```text
//! match_treatment()
//!   ├─ validate inputs
//!   ├─ Kernel::new()                  (distance.rs)
//!   ├─ chunks()                       (partition.rs)
//!   │    └─ reduce_chunk()            (reduce.rs)
//!   │         └─ select_k_smallest()  (select.rs)
//!   ├─ CandidateAccumulator::absorb() (accumulate.rs)
//!   └─ CandidateAccumulator::finish() (accumulate.rs)
//! ```
//!
//! # Ties
//!
//! Candidates are ordered by distance, then by comparison-pool row index, with
//! NaN distances after every number. Equal distances therefore resolve to the
//! earlier pool row, whatever the chunk size or thread count.

pub mod accumulate;
pub mod config;
pub mod distance;
pub mod error;
pub mod features;
pub mod knn;
pub mod partition;
pub mod reduce;
pub mod result;
pub mod select;

pub use accumulate::CandidateAccumulator;
pub use config::{MatchConfig, MatchCount};
pub use distance::DistanceMetric;
pub use error::MatchError;
pub use features::FeatureMatrix;
pub use knn::{match_treatment, match_treatment_with_scratch};
pub use partition::{Chunk, Chunks, chunks, n_chunks};
pub use reduce::{ChunkCandidates, ChunkScratch, chunk_retain_count};
pub use result::{Match, MatchResult, TreatmentMatches};
pub use select::{Candidate, candidate_cmp, select_k_smallest, sort_candidates};
