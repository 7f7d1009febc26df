use std::path::PathBuf;

use serde::Deserialize;

/// Top-level Gridmatch configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GridmatchConfig {
    /// I/O settings.
    #[serde(default)]
    pub io: IoConfig,

    /// Matching settings.
    #[serde(default)]
    pub matching: MatchingToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    pub treatment: Option<PathBuf>,
    pub comparison_pool: Option<PathBuf>,
    pub output: Option<PathBuf>,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            treatment: None,
            comparison_pool: None,
            output: None,
            id_column: default_id_column(),
            compression: default_compression(),
            row_group_size: default_row_group_size(),
        }
    }
}

fn default_id_column() -> String {
    "id".to_string()
}
fn default_compression() -> String {
    "snappy".to_string()
}
fn default_row_group_size() -> usize {
    1_000_000
}

/// `n_matches_per_treatment`: a count, or the string `"all"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MatchCountToml {
    Count(usize),
    Name(String),
}

impl Default for MatchCountToml {
    fn default() -> Self {
        Self::Count(4)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingToml {
    #[serde(default)]
    pub n_matches_per_treatment: MatchCountToml,
    #[serde(default = "default_n_meters_per_chunk")]
    pub n_meters_per_chunk: usize,
    #[serde(default = "default_distance_metric")]
    pub distance_metric: String,
    #[serde(default)]
    pub minkowski_p: Option<f64>,
    #[serde(default)]
    pub parallel: bool,
}

impl Default for MatchingToml {
    fn default() -> Self {
        Self {
            n_matches_per_treatment: MatchCountToml::default(),
            n_meters_per_chunk: default_n_meters_per_chunk(),
            distance_metric: default_distance_metric(),
            minkowski_p: None,
            parallel: false,
        }
    }
}

fn default_n_meters_per_chunk() -> usize {
    10_000
}
fn default_distance_metric() -> String {
    "euclidean".to_string()
}
