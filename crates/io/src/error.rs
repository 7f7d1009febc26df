//! Error types for gridmatch-io.

use std::path::PathBuf;

/// Error type for all fallible operations in the gridmatch-io crate.
///
/// Covers file-system failures, errors from the Arrow and Parquet libraries,
/// and feature tables whose layout does not fit the matching engine.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when a required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Wraps an error originating from the Parquet or Arrow libraries.
    #[error("parquet error: {reason}")]
    Parquet {
        /// Description of the underlying failure.
        reason: String,
    },

    /// Returned when one or more validation checks fail.
    #[error("{count} validation error(s): {details}")]
    Validation {
        /// Number of accumulated validation failures.
        count: usize,
        /// Human-readable summary of the failures.
        details: String,
    },

    /// Returned when a required column is not present in a file.
    #[error("column '{name}' not found in {}", path.display())]
    MissingColumn {
        /// Name of the missing column.
        name: String,
        /// Path to the file that was inspected.
        path: PathBuf,
    },

    /// Returned when two feature tables do not share the same feature columns.
    #[error("feature columns differ: treatment has {treatment:?}, comparison pool has {comparison:?}")]
    FeatureColumnsMismatch {
        /// Treatment feature column names.
        treatment: Vec<String>,
        /// Comparison-pool feature column names.
        comparison: Vec<String>,
    },
}

impl From<parquet::errors::ParquetError> for IoError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        IoError::Parquet {
            reason: e.to_string(),
        }
    }
}

impl From<arrow::error::ArrowError> for IoError {
    fn from(e: arrow::error::ArrowError) -> Self {
        IoError::Parquet {
            reason: e.to_string(),
        }
    }
}

impl From<gridmatch_knn::MatchError> for IoError {
    fn from(e: gridmatch_knn::MatchError) -> Self {
        IoError::Validation {
            count: 1,
            details: e.to_string(),
        }
    }
}
