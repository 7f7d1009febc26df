//! Integration test: write match results to Parquet.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, UInt32Type};
use gridmatch_io::{Compression, ReaderConfig, WriterConfig, read_features, write_matches};
use gridmatch_knn::{DistanceMetric, FeatureMatrix, MatchConfig, MatchCount, match_treatment};
use ndarray::array;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

fn read_all(path: &Path) -> Vec<RecordBatch> {
    let file = std::fs::File::open(path).expect("open file");
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("builder")
        .build()
        .expect("reader");
    reader.collect::<Result<Vec<_>, _>>().expect("batches")
}

/// Writes a two-feature table (`meter`, `kwh`, `peak`) with a plain ArrowWriter.
fn write_features(path: &Path, ids: &[&str], kwh: &[f64], peak: &[f64]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("meter", DataType::Utf8, false),
        Field::new("kwh", DataType::Float64, false),
        Field::new("peak", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids.to_vec())),
        Arc::new(Float64Array::from(kwh.to_vec())),
        Arc::new(Float64Array::from(peak.to_vec())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).expect("valid batch");
    let file = std::fs::File::create(path).expect("create file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("writer");
    writer.write(&batch).expect("write batch");
    writer.close().expect("close writer");
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn matches_round_trip_for_every_compression() {
    let treatment = FeatureMatrix::new(owned(&["t1"]), array![[0.0, 0.0]]).unwrap();
    let pool = FeatureMatrix::new(
        owned(&["a", "b", "c"]),
        array![[1.0, 0.0], [0.0, 5.0], [3.0, 4.0]],
    )
    .unwrap();
    let config = MatchConfig::new(DistanceMetric::Euclidean)
        .with_n_matches(MatchCount::Limit(2))
        .with_chunk_size(2);
    let result = match_treatment(&treatment, &pool, &config).unwrap();

    let dir = tempfile::tempdir().expect("create temp dir");
    for compression in [Compression::None, Compression::Snappy, Compression::Zstd] {
        let path = dir.path().join(format!("matches_{compression}.parquet"));
        let wc = WriterConfig::default().with_compression(compression);
        write_matches(&path, &result, &wc).expect("write succeeds");

        let batches = read_all(&path);
        let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(total, 2);

        let batch = &batches[0];
        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "treatment_id");
        assert_eq!(schema.field(1).name(), "rank");
        assert_eq!(schema.field(1).data_type(), &DataType::UInt32);
        assert_eq!(schema.field(2).name(), "comparison_id");
        assert_eq!(schema.field(3).name(), "distance");

        let ranks = batch.column(1).as_primitive::<UInt32Type>();
        let c_ids = batch.column(2).as_string::<i32>();
        let dists = batch.column(3).as_primitive::<Float64Type>();
        assert_eq!(ranks.values().to_vec(), vec![1, 2]);
        assert_eq!(c_ids.value(0), "a");
        assert_eq!(c_ids.value(1), "b");
        assert_eq!(dists.values().to_vec(), vec![1.0, 5.0]);
    }
}

#[test]
fn empty_pool_writes_header_only() {
    let treatment = FeatureMatrix::new(owned(&["t1", "t2"]), array![[0.0], [1.0]]).unwrap();
    let pool: FeatureMatrix<String> = FeatureMatrix::empty(1);
    let result = match_treatment(&treatment, &pool, &MatchConfig::default()).unwrap();
    assert_eq!(result.len(), 2);

    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("empty.parquet");
    write_matches(&path, &result, &WriterConfig::default()).expect("write succeeds");

    let total: usize = read_all(&path).iter().map(RecordBatch::num_rows).sum();
    assert_eq!(total, 0);
}

#[test]
fn small_row_groups_split_output() {
    let treatment = FeatureMatrix::new(owned(&["t1"]), array![[0.0]]).unwrap();
    let ids: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
    let pool = FeatureMatrix::new(ids, ndarray::Array2::from_shape_fn((10, 1), |(i, _)| i as f64))
        .unwrap();
    let config = MatchConfig::default().with_n_matches(MatchCount::All);
    let result = match_treatment(&treatment, &pool, &config).unwrap();

    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("groups.parquet");
    let wc = WriterConfig::default().with_row_group_size(3);
    write_matches(&path, &result, &wc).expect("write succeeds");

    let file = std::fs::File::open(&path).expect("open file");
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).expect("builder");
    assert_eq!(builder.metadata().num_row_groups(), 4);
}

#[test]
fn matched_features_read_back_from_parquet() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let t_path = dir.path().join("treatment.parquet");
    let p_path = dir.path().join("pool.parquet");
    write_features(&t_path, &["t1"], &[0.0], &[0.0]);
    write_features(&p_path, &["a", "b", "c"], &[1.0, 0.0, 3.0], &[0.0, 5.0, f64::NAN]);

    let config = ReaderConfig::default().with_id_column("meter");
    let treatment = read_features(&t_path, &config).expect("read treatment");
    let pool = read_features(&p_path, &config).expect("read pool");
    assert_eq!(pool.feature_names(), ["kwh", "peak"]);
    assert!(pool.values()[[2, 1]].is_nan());

    let result = match_treatment(
        &treatment.into_matrix().unwrap(),
        &pool.into_matrix().unwrap(),
        &MatchConfig::default().with_n_matches(MatchCount::All),
    )
    .unwrap();
    let ids: Vec<&str> = result.iter().next().unwrap().ids().map(String::as_str).collect();
    // NaN distance ranks last.
    assert_eq!(ids, vec!["a", "b", "c"]);
}
