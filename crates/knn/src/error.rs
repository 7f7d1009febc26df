//! Error types for the gridmatch-knn crate.

/// Error type for all fallible operations in the gridmatch-knn crate.
///
/// Every variant is an input-validation failure detected before any chunk is
/// processed; none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// Returned when the chunk size is zero.
    #[error("n_meters_per_chunk must be >= 1, got {size}")]
    InvalidChunkSize {
        /// The invalid chunk size.
        size: usize,
    },

    /// Returned when the number of matches per treatment row is zero.
    #[error("n_matches_per_treatment must be >= 1, got {k}")]
    InvalidMatchCount {
        /// The invalid match count.
        k: usize,
    },

    /// Returned when a match count is neither an integer nor `"all"`.
    #[error("n_matches_per_treatment must be an integer or \"all\", got {value:?}")]
    UnparsableMatchCount {
        /// The text that failed to parse.
        value: String,
    },

    /// Returned when a distance metric name is not recognised.
    #[error("unknown distance metric: {name:?}")]
    UnknownMetric {
        /// The name that failed to parse.
        name: String,
    },

    /// Returned when the Minkowski exponent is non-finite or below 1.
    #[error("minkowski p must be finite and >= 1, got {p}")]
    InvalidMinkowskiP {
        /// The invalid exponent.
        p: f64,
    },

    /// Returned when the treatment and comparison-pool matrices have a
    /// different number of features.
    #[error(
        "feature dimension mismatch: treatment has {treatment} features, comparison pool has {comparison}"
    )]
    FeatureDimensionMismatch {
        /// Number of treatment features.
        treatment: usize,
        /// Number of comparison-pool features.
        comparison: usize,
    },

    /// Returned when an identifier array does not have one entry per matrix row.
    #[error("identifier array has {ids} entries but the matrix has {rows} rows")]
    IdentifierLengthMismatch {
        /// Length of the identifier array.
        ids: usize,
        /// Number of matrix rows.
        rows: usize,
    },

    /// Returned when rows handed to a matrix constructor differ in length.
    #[error("row {row} has {len} values, expected {expected}")]
    RaggedRows {
        /// Index of the first offending row.
        row: usize,
        /// Length of that row.
        len: usize,
        /// Length of row 0.
        expected: usize,
    },

    /// Returned when the treatment matrix has no rows.
    #[error("treatment matrix has no rows")]
    EmptyTreatment,
}
