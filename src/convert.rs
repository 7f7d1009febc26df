//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};

use crate::config::*;

use gridmatch_io::{Compression, ReaderConfig, WriterConfig};
use gridmatch_knn::{DistanceMetric, MatchConfig, MatchCount};

/// Parses a compression algorithm name string into the corresponding enum variant.
pub fn parse_compression(s: &str) -> Result<Compression> {
    s.parse().with_context(|| format!("unknown compression: {s:?}"))
}

/// Parses a match count given as a positive integer or `"all"`.
pub fn parse_match_count(s: &str) -> Result<MatchCount> {
    let count: MatchCount = s
        .parse()
        .with_context(|| format!("invalid n_matches_per_treatment: {s:?}"))?;
    if count == MatchCount::Limit(0) {
        bail!("n_matches_per_treatment must be at least 1");
    }
    Ok(count)
}

/// Converts the TOML match count into a [`MatchCount`].
pub fn build_match_count(t: &MatchCountToml) -> Result<MatchCount> {
    match t {
        MatchCountToml::Count(0) => bail!("n_matches_per_treatment must be at least 1"),
        MatchCountToml::Count(k) => Ok(MatchCount::Limit(*k)),
        MatchCountToml::Name(name) => parse_match_count(name),
    }
}

/// Parses a metric name, applying `minkowski_p` when the metric is Minkowski.
///
/// A `minkowski_p` given for any other metric is an error.
pub fn parse_metric(name: &str, minkowski_p: Option<f64>) -> Result<DistanceMetric> {
    let metric: DistanceMetric = name
        .parse()
        .with_context(|| format!("invalid distance_metric: {name:?}"))?;
    let metric = match (metric, minkowski_p) {
        (DistanceMetric::Minkowski { .. }, Some(p)) => DistanceMetric::minkowski(p),
        (m, Some(_)) => bail!("minkowski_p is only valid with distance_metric = \"minkowski\", got {m}"),
        (m, None) => m,
    };
    metric.validate()?;
    Ok(metric)
}

/// Builds a [`MatchConfig`] from the TOML matching configuration.
pub fn build_match_config(m: &MatchingToml) -> Result<MatchConfig> {
    let metric = parse_metric(&m.distance_metric, m.minkowski_p)?;
    let cfg = MatchConfig::new(metric)
        .with_n_matches(build_match_count(&m.n_matches_per_treatment)?)
        .with_chunk_size(m.n_meters_per_chunk)
        .with_parallel(m.parallel);
    cfg.validate()?;
    Ok(cfg)
}

/// Builds a [`ReaderConfig`] from the TOML I/O configuration.
pub fn build_reader_config(io: &IoConfig) -> Result<ReaderConfig> {
    let cfg = ReaderConfig::default().with_id_column(&io.id_column);
    cfg.validate()?;
    Ok(cfg)
}

/// Builds a [`WriterConfig`] from the TOML I/O configuration.
pub fn build_writer_config(io: &IoConfig) -> Result<WriterConfig> {
    if io.row_group_size == 0 {
        bail!("row_group_size must be greater than 0");
    }
    Ok(WriterConfig::default()
        .with_compression(parse_compression(&io.compression)?)
        .with_row_group_size(io.row_group_size))
}
