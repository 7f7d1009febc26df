//! Low-level Parquet column building.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use gridmatch_knn::MatchResult;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::error::IoError;

/// Column names of the long-format match output.
pub(crate) const MATCH_COLUMNS: [&str; 4] = ["treatment_id", "rank", "comparison_id", "distance"];

/// Builds the Arrow schema for long-format match output.
pub(crate) fn build_match_schema() -> Schema {
    Schema::new(vec![
        Field::new(MATCH_COLUMNS[0], DataType::Utf8, false),
        Field::new(MATCH_COLUMNS[1], DataType::UInt32, false),
        Field::new(MATCH_COLUMNS[2], DataType::Utf8, false),
        Field::new(MATCH_COLUMNS[3], DataType::Float64, false),
    ])
}

/// Flattens a [`MatchResult`] into one record batch, one row per match.
///
/// Ranks are 1-based. Treatment rows with no matches contribute no rows.
pub(crate) fn matches_to_record_batch(
    result: &MatchResult<String>,
    schema: &Schema,
) -> Result<RecordBatch, IoError> {
    let n = result.n_matches();
    let mut treatment_ids: Vec<&str> = Vec::with_capacity(n);
    let mut ranks: Vec<u32> = Vec::with_capacity(n);
    let mut comparison_ids: Vec<&str> = Vec::with_capacity(n);
    let mut distances: Vec<f64> = Vec::with_capacity(n);

    for row in result {
        for (rank, m) in row.matches.iter().enumerate() {
            let rank = u32::try_from(rank + 1).map_err(|_| IoError::Validation {
                count: 1,
                details: format!("rank {} exceeds the u32 range", rank + 1),
            })?;
            treatment_ids.push(&row.id);
            ranks.push(rank);
            comparison_ids.push(&m.id);
            distances.push(m.distance);
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(treatment_ids)),
        Arc::new(UInt32Array::from(ranks)),
        Arc::new(StringArray::from(comparison_ids)),
        Arc::new(Float64Array::from(distances)),
    ];

    RecordBatch::try_new(Arc::new(schema.clone()), columns).map_err(|e| IoError::Parquet {
        reason: e.to_string(),
    })
}

/// Writes a sequence of [`RecordBatch`]es to a Parquet file at `path`.
///
/// # Errors
///
/// Returns [`IoError::Parquet`] if file creation, batch writing, or file
/// finalisation fails.
pub(crate) fn write_batches(
    path: &Path,
    batches: &[RecordBatch],
    schema: &Schema,
    props: WriterProperties,
) -> Result<(), IoError> {
    let file = std::fs::File::create(path).map_err(|e| IoError::Parquet {
        reason: e.to_string(),
    })?;
    let mut writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))?;

    for batch in batches {
        writer.write(batch)?;
    }

    writer.close()?;
    Ok(())
}
