//! High-level feature-table reader configuration and orchestration.

use std::path::Path;

use gridmatch_knn::FeatureMatrix;
use ndarray::{Array2, ArrayView2};
use tracing::{debug, info};

use crate::error::IoError;
use crate::parquet_read;

// ---------------------------------------------------------------------------
// ReaderConfig
// ---------------------------------------------------------------------------

/// Configuration for reading feature tables from Parquet files.
///
/// The identifier column defaults to `"id"`; every other column is a feature.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Name of the Utf8 identifier column.
    id_column: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            id_column: "id".into(),
        }
    }
}

impl ReaderConfig {
    /// Set the identifier column name.
    pub fn with_id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = name.into();
        self
    }

    /// Returns the identifier column name.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Validate that the configuration is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] if the identifier column name is empty.
    pub fn validate(&self) -> Result<(), IoError> {
        if self.id_column.trim().is_empty() {
            return Err(IoError::Validation {
                count: 1,
                details: "id_column must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FeatureTable
// ---------------------------------------------------------------------------

/// A feature table read from disk: identifiers, column names and values.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    ids: Vec<String>,
    feature_names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Creates a table from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] if the identifier count or feature-name
    /// count disagrees with the value array's shape.
    pub fn new(
        ids: Vec<String>,
        feature_names: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, IoError> {
        let mut problems = Vec::new();
        if ids.len() != values.nrows() {
            problems.push(format!(
                "{} identifiers for {} rows",
                ids.len(),
                values.nrows()
            ));
        }
        if feature_names.len() != values.ncols() {
            problems.push(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                values.ncols()
            ));
        }
        if !problems.is_empty() {
            return Err(IoError::Validation {
                count: problems.len(),
                details: problems.join("; "),
            });
        }
        Ok(Self {
            ids,
            feature_names,
            values,
        })
    }

    /// Row identifiers in file order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Feature column names in file order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Read-only view of the `n_rows × n_features` values.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of feature columns.
    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Converts into a [`FeatureMatrix`] for the matching engine.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Validation`] if identifiers and rows disagree.
    pub fn into_matrix(self) -> Result<FeatureMatrix<String>, IoError> {
        Ok(FeatureMatrix::new(self.ids, self.values)?)
    }
}

// ---------------------------------------------------------------------------
// read_features / check_compatible
// ---------------------------------------------------------------------------

/// Read a feature table from a Parquet file.
///
/// The identifier column must be Utf8 (or LargeUtf8). Every other column is a
/// feature and must be Float64, Float32, Int64 or Int32; values are cast to
/// `f64`. Nulls are rejected, while NaN values are kept and propagate into
/// distances.
///
/// # Errors
///
/// Returns [`IoError::FileNotFound`], [`IoError::MissingColumn`],
/// [`IoError::Validation`] for unsupported types or nulls, or
/// [`IoError::Parquet`] on read failures.
pub fn read_features(path: &Path, config: &ReaderConfig) -> Result<FeatureTable, IoError> {
    config.validate()?;

    let (schema, batches) = parquet_read::read_batches(path)?;
    debug!(
        path = %path.display(),
        n_batches = batches.len(),
        n_columns = schema.fields().len(),
        "read parquet batches"
    );

    let (id_idx, features) = parquet_read::resolve_columns(&schema, &config.id_column, path)?;
    let ids = parquet_read::extract_ids(&batches, id_idx, &config.id_column)?;
    let values = parquet_read::extract_features(&batches, &features)?;
    let feature_names = features.into_iter().map(|(_, name)| name).collect();

    let table = FeatureTable::new(ids, feature_names, values)?;
    info!(
        path = %path.display(),
        rows = table.n_rows(),
        features = table.n_features(),
        "loaded feature table"
    );
    Ok(table)
}

/// Checks that two tables carry the same feature columns in the same order.
///
/// # Errors
///
/// Returns [`IoError::FeatureColumnsMismatch`] listing both column sets.
pub fn check_compatible(treatment: &FeatureTable, comparison: &FeatureTable) -> Result<(), IoError> {
    if treatment.feature_names != comparison.feature_names {
        return Err(IoError::FeatureColumnsMismatch {
            treatment: treatment.feature_names.clone(),
            comparison: comparison.feature_names.clone(),
        });
    }
    Ok(())
}
