//! Match command: read feature tables, run the matcher, write long-format matches.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, info_span, warn};

use gridmatch_io::{check_compatible, read_features, write_matches};
use gridmatch_knn::{match_treatment, n_chunks};

use crate::cli::MatchArgs;
use crate::config::GridmatchConfig;
use crate::convert;

const DEFAULT_CONFIG: &str = "gridmatch.toml";

/// Loads the TOML config.
///
/// An explicit path must exist. Without one, `./gridmatch.toml` is used when
/// present and built-in defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<GridmatchConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                debug!("no {DEFAULT_CONFIG} found, using defaults");
                return Ok(GridmatchConfig::default());
            }
            default
        }
    };
    let toml_str = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&toml_str).context("failed to parse TOML config")
}

/// Run the matching pipeline.
pub fn run(args: MatchArgs) -> Result<()> {
    let _cmd = info_span!("match").entered();

    // 1. Load config and apply CLI overrides
    let mut config = load_config(args.config.as_deref())?;
    if let Some(p) = args.treatment {
        config.io.treatment = Some(p);
    }
    if let Some(p) = args.pool {
        config.io.comparison_pool = Some(p);
    }
    if let Some(p) = args.output {
        config.io.output = Some(p);
    }
    if let Some(c) = args.chunk_size {
        config.matching.n_meters_per_chunk = c;
    }
    if let Some(m) = args.metric {
        config.matching.distance_metric = m;
    }

    let mut match_cfg = convert::build_match_config(&config.matching)?;
    if let Some(k) = args.n_matches.as_deref() {
        match_cfg = match_cfg.with_n_matches(convert::parse_match_count(k)?);
    }
    let reader_cfg = convert::build_reader_config(&config.io)?;
    let writer_cfg = convert::build_writer_config(&config.io)?;

    let treatment_path = config.io.treatment.as_ref().ok_or_else(|| {
        anyhow!("no treatment path: set [io].treatment in config or use --treatment")
    })?;
    let pool_path = config.io.comparison_pool.as_ref().ok_or_else(|| {
        anyhow!("no comparison pool path: set [io].comparison_pool in config or use --pool")
    })?;
    let output_path = config
        .io
        .output
        .as_ref()
        .ok_or_else(|| anyhow!("no output path: set [io].output in config or use --output"))?;

    // 2. Read feature tables
    info!(path = %treatment_path.display(), "reading treatment features");
    let treatment = read_features(treatment_path, &reader_cfg)
        .with_context(|| format!("failed to read Parquet: {}", treatment_path.display()))?;
    info!(path = %pool_path.display(), "reading comparison pool features");
    let pool = read_features(pool_path, &reader_cfg)
        .with_context(|| format!("failed to read Parquet: {}", pool_path.display()))?;

    check_compatible(&treatment, &pool).context("treatment and comparison pool differ")?;
    let treatment = treatment.into_matrix()?;
    let pool = pool.into_matrix()?;

    info!(
        n_treatment = treatment.n_rows(),
        n_comparison = pool.n_rows(),
        n_features = treatment.n_features(),
        metric = %match_cfg.metric(),
        n_matches = %match_cfg.n_matches(),
        chunk_size = match_cfg.chunk_size(),
        n_chunks = n_chunks(pool.n_rows(), match_cfg.chunk_size()),
        parallel = match_cfg.parallel(),
        "matching"
    );

    // 3. Match
    let result = match_treatment(&treatment, &pool, &match_cfg).context("matching failed")?;

    // 4. Summarise matched distances
    let distances: Vec<f64> = result.distances().collect();
    match gridmatch_stats::summarize(&distances) {
        Some(s) => {
            info!(
                n_matches = result.n_matches(),
                mean = s.mean,
                median = s.median,
                min = s.min,
                max = s.max,
                "matched distance summary"
            );
            if s.n_nan > 0 {
                warn!(n_nan = s.n_nan, "some matched distances are NaN");
            }
        }
        None if result.n_matches() > 0 => {
            warn!(n_matches = result.n_matches(), "every matched distance is NaN");
        }
        None => warn!("no matches produced"),
    }

    // 5. Write output
    write_matches(output_path, &result, &writer_cfg)
        .with_context(|| format!("failed to write Parquet: {}", output_path.display()))?;
    info!(path = %output_path.display(), "matches written");

    Ok(())
}
