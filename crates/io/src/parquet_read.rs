//! Low-level Parquet reading and column extraction.

use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, SchemaRef};
use ndarray::Array2;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::IoError;

/// Reads the schema and all record batches from a Parquet file.
///
/// The schema is returned separately so that files with zero rows still
/// expose their columns.
///
/// # Errors
///
/// Returns [`IoError::FileNotFound`] if the file does not exist, or
/// [`IoError::Parquet`] if the file cannot be opened or read.
pub(crate) fn read_batches(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), IoError> {
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|e| IoError::Parquet {
        reason: e.to_string(),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches: Vec<RecordBatch> =
        reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IoError::Parquet {
                reason: e.to_string(),
            })?;

    Ok((schema, batches))
}

/// Splits the schema into the identifier column index and the feature
/// columns (index and name, in file order).
///
/// # Errors
///
/// Returns [`IoError::MissingColumn`] if `id_column` is absent, or
/// [`IoError::Validation`] listing every column whose type is unsupported.
pub(crate) fn resolve_columns(
    schema: &SchemaRef,
    id_column: &str,
    path: &Path,
) -> Result<(usize, Vec<(usize, String)>), IoError> {
    let id_idx = schema
        .index_of(id_column)
        .map_err(|_| IoError::MissingColumn {
            name: id_column.to_string(),
            path: path.to_path_buf(),
        })?;

    let mut problems: Vec<String> = Vec::new();

    let id_type = schema.field(id_idx).data_type();
    if !is_string_type(id_type) {
        problems.push(format!(
            "identifier column '{id_column}' must be a string, got {id_type}"
        ));
    }

    let mut features = Vec::with_capacity(schema.fields().len().saturating_sub(1));
    for (i, field) in schema.fields().iter().enumerate() {
        if i == id_idx {
            continue;
        }
        if is_numeric_type(field.data_type()) {
            features.push((i, field.name().clone()));
        } else {
            problems.push(format!(
                "feature column '{}' has unsupported type {}",
                field.name(),
                field.data_type()
            ));
        }
    }

    if !problems.is_empty() {
        return Err(IoError::Validation {
            count: problems.len(),
            details: problems.join("; "),
        });
    }

    Ok((id_idx, features))
}

fn is_string_type(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8)
}

fn is_numeric_type(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32
    )
}

/// Rejects a column that contains nulls.
fn check_no_nulls(array: &ArrayRef, name: &str) -> Result<(), IoError> {
    let nulls = array.null_count();
    if nulls > 0 {
        return Err(IoError::Validation {
            count: 1,
            details: format!("column '{name}' contains {nulls} null value(s)"),
        });
    }
    Ok(())
}

/// Collects the identifier column across all batches.
pub(crate) fn extract_ids(
    batches: &[RecordBatch],
    id_idx: usize,
    id_column: &str,
) -> Result<Vec<String>, IoError> {
    let n_rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let mut ids = Vec::with_capacity(n_rows);

    for batch in batches {
        let column = batch.column(id_idx);
        check_no_nulls(column, id_column)?;
        let column = cast(column, &DataType::Utf8)?;
        ids.extend(column.as_string::<i32>().iter().flatten().map(str::to_owned));
    }

    Ok(ids)
}

/// Collects the feature columns across all batches into a row-major
/// `n_rows × n_features` array, casting every column to `f64`.
pub(crate) fn extract_features(
    batches: &[RecordBatch],
    features: &[(usize, String)],
) -> Result<Array2<f64>, IoError> {
    let n_rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let mut values = Array2::<f64>::zeros((n_rows, features.len()));

    let mut offset = 0;
    for batch in batches {
        for (j, (col_idx, name)) in features.iter().enumerate() {
            let column = batch.column(*col_idx);
            check_no_nulls(column, name)?;
            let column = cast(column, &DataType::Float64)?;
            for (i, v) in column.as_primitive::<Float64Type>().values().iter().enumerate() {
                values[[offset + i, j]] = *v;
            }
        }
        offset += batch.num_rows();
    }

    Ok(values)
}
