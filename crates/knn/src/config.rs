//! Configuration for a matching run.

use std::fmt;
use std::str::FromStr;

use crate::distance::DistanceMetric;
use crate::error::MatchError;

/// How many comparison rows to keep per treatment row (`n_matches_per_treatment`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCount {
    /// Keep at most this many matches.
    Limit(usize),
    /// Keep every comparison-pool row, fully sorted.
    All,
}

impl MatchCount {
    /// Effective K for a pool of `n_pool` rows: `min(limit, n_pool)`, or `n_pool` for `All`.
    pub fn resolve(&self, n_pool: usize) -> usize {
        match *self {
            Self::Limit(k) => k.min(n_pool),
            Self::All => n_pool,
        }
    }
}

impl Default for MatchCount {
    fn default() -> Self {
        Self::Limit(4)
    }
}

impl fmt::Display for MatchCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(k) => write!(f, "{k}"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for MatchCount {
    type Err = MatchError;

    /// Parses `"all"` (case-insensitive) or a non-negative integer.
    ///
    /// Zero parses successfully and is rejected later by
    /// [`MatchConfig::validate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<usize>()
            .map(Self::Limit)
            .map_err(|_| MatchError::UnparsableMatchCount {
                value: s.to_string(),
            })
    }
}

/// Configuration for a matching run.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use gridmatch_knn::{DistanceMetric, MatchConfig, MatchCount};
///
/// let config = MatchConfig::new(DistanceMetric::Euclidean)
///     .with_n_matches(MatchCount::Limit(10))
///     .with_chunk_size(5_000);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Distance metric applied to every pair.
    metric: DistanceMetric,
    /// Matches kept per treatment row.
    n_matches: MatchCount,
    /// Comparison-pool rows per chunk (`n_meters_per_chunk`).
    chunk_size: usize,
    /// Process chunks on the rayon thread pool.
    parallel: bool,
}

impl MatchConfig {
    /// Creates a configuration for `metric`.
    ///
    /// Defaults: `n_matches = Limit(4)`, `chunk_size = 10_000`, `parallel = false`.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            n_matches: MatchCount::default(),
            chunk_size: 10_000,
            parallel: false,
        }
    }

    /// Sets the number of matches per treatment row.
    pub fn with_n_matches(mut self, n_matches: MatchCount) -> Self {
        self.n_matches = n_matches;
        self
    }

    /// Sets the number of comparison-pool rows per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enables or disables parallel chunk processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Returns the number of matches per treatment row.
    pub fn n_matches(&self) -> MatchCount {
        self.n_matches
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns whether chunks are processed in parallel.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Validates this configuration.
    ///
    /// Returns an error if the chunk size is zero, the match count is
    /// `Limit(0)`, or the metric parameters are invalid.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.chunk_size < 1 {
            return Err(MatchError::InvalidChunkSize {
                size: self.chunk_size,
            });
        }
        if self.n_matches == MatchCount::Limit(0) {
            return Err(MatchError::InvalidMatchCount { k: 0 });
        }
        self.metric.validate()
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}
