//! Feature matrices with positionally associated identifiers.

use ndarray::{Array2, ArrayView2};

use crate::error::MatchError;

/// An immutable `n_rows × n_features` matrix with one identifier per row.
///
/// Identifiers are opaque: the engine only clones them into results, so they
/// need not be sortable, hashable or unique.
#[derive(Debug, Clone)]
pub struct FeatureMatrix<Id> {
    ids: Vec<Id>,
    values: Array2<f64>,
}

impl<Id> FeatureMatrix<Id> {
    /// Creates a matrix from identifiers and an owned value array.
    ///
    /// Non-standard layouts (e.g. transposed arrays) are copied into row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::IdentifierLengthMismatch`] if `ids.len()` differs
    /// from the number of rows.
    pub fn new(ids: Vec<Id>, values: Array2<f64>) -> Result<Self, MatchError> {
        if ids.len() != values.nrows() {
            return Err(MatchError::IdentifierLengthMismatch {
                ids: ids.len(),
                rows: values.nrows(),
            });
        }
        let values = if values.is_standard_layout() {
            values
        } else {
            values.as_standard_layout().into_owned()
        };
        Ok(Self { ids, values })
    }

    /// Creates a matrix from identifiers and row vectors.
    ///
    /// An empty `rows` slice produces a `0 × 0` matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::RaggedRows`] if rows differ in length, or
    /// [`MatchError::IdentifierLengthMismatch`] if `ids.len() != rows.len()`.
    pub fn from_rows(ids: Vec<Id>, rows: &[Vec<f64>]) -> Result<Self, MatchError> {
        let n_features = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(MatchError::RaggedRows {
                row,
                len: r.len(),
                expected: n_features,
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), n_features), flat).map_err(|_| {
            MatchError::RaggedRows {
                row: 0,
                len: n_features,
                expected: n_features,
            }
        })?;
        Self::new(ids, values)
    }

    /// Creates an empty matrix with `n_features` columns.
    pub fn empty(n_features: usize) -> Self {
        Self {
            ids: Vec::new(),
            values: Array2::zeros((0, n_features)),
        }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features per row.
    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Returns `true` if the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Row identifiers, in row order.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Read-only view of the values.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}
