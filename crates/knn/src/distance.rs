//! Pairwise distance metrics and the dense treatment × chunk distance kernel.

use std::fmt;
use std::str::FromStr;

use gridmatch_stats::RunningVariance;
use ndarray::{ArrayView1, ArrayView2};

use crate::error::MatchError;

/// Distance metric applied uniformly to every (treatment, comparison) pair.
///
/// Names follow the usual `cdist` vocabulary so configuration files written for
/// other tooling keep working.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DistanceMetric {
    /// `sqrt(Σ (u - v)²)`
    #[default]
    Euclidean,
    /// `Σ (u - v)²`
    SqEuclidean,
    /// `Σ |u - v|`, also accepted as `manhattan`.
    Cityblock,
    /// `max |u - v|`
    Chebyshev,
    /// `(Σ |u - v|^p)^(1/p)`
    Minkowski {
        /// Exponent, finite and >= 1.
        p: f64,
    },
    /// `1 - u·v / (‖u‖ ‖v‖)`. NaN if either vector is all zeros.
    Cosine,
    /// `Σ |u - v| / (|u| + |v|)`, with 0/0 terms counted as 0.
    Canberra,
    /// `Σ |u - v| / Σ |u + v|`. NaN when both vectors are all zeros.
    BrayCurtis,
    /// `sqrt(Σ (u - v)² / V)` where `V` is the per-feature sample variance over
    /// the treatment rows and the whole comparison pool.
    SEuclidean,
}

impl DistanceMetric {
    /// Minkowski metric with exponent `p`.
    pub fn minkowski(p: f64) -> Self {
        Self::Minkowski { p }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::SqEuclidean => "sqeuclidean",
            Self::Cityblock => "cityblock",
            Self::Chebyshev => "chebyshev",
            Self::Minkowski { .. } => "minkowski",
            Self::Cosine => "cosine",
            Self::Canberra => "canberra",
            Self::BrayCurtis => "braycurtis",
            Self::SEuclidean => "seuclidean",
        }
    }

    /// Checks metric parameters.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidMinkowskiP`] if a Minkowski exponent is
    /// non-finite or below 1.
    pub fn validate(&self) -> Result<(), MatchError> {
        if let Self::Minkowski { p } = *self {
            if !p.is_finite() || p < 1.0 {
                return Err(MatchError::InvalidMinkowskiP { p });
            }
        }
        Ok(())
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minkowski { p } => write!(f, "minkowski(p={p})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = MatchError;

    /// Parses a metric name, case-insensitively. `minkowski` defaults to `p = 2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "sqeuclidean" => Ok(Self::SqEuclidean),
            "cityblock" | "manhattan" => Ok(Self::Cityblock),
            "chebyshev" => Ok(Self::Chebyshev),
            "minkowski" => Ok(Self::Minkowski { p: 2.0 }),
            "cosine" => Ok(Self::Cosine),
            "canberra" => Ok(Self::Canberra),
            "braycurtis" => Ok(Self::BrayCurtis),
            "seuclidean" => Ok(Self::SEuclidean),
            _ => Err(MatchError::UnknownMetric {
                name: s.to_string(),
            }),
        }
    }
}

/// A metric bound to any per-invocation state it needs.
///
/// Only the standardized Euclidean metric carries state (inverse feature
/// variances); it is computed once over the full inputs so that chunking can
/// never change a distance.
#[derive(Debug, Clone)]
pub(crate) struct Kernel {
    metric: DistanceMetric,
    inv_var: Vec<f64>,
}

impl Kernel {
    /// Prepares `metric` for a treatment/pool pair.
    pub(crate) fn new(
        metric: DistanceMetric,
        treatment: ArrayView2<'_, f64>,
        pool: ArrayView2<'_, f64>,
    ) -> Self {
        let inv_var = match metric {
            DistanceMetric::SEuclidean => inverse_variances(treatment, pool),
            _ => Vec::new(),
        };
        Self { metric, inv_var }
    }

    /// Fills `out` (row-major, `treatment.nrows() × chunk.nrows()`) with all
    /// pairwise distances.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `out` has exactly `treatment.nrows() * chunk.nrows()` slots.
    pub(crate) fn pairwise(
        &self,
        treatment: ArrayView2<'_, f64>,
        chunk: ArrayView2<'_, f64>,
        out: &mut [f64],
    ) {
        debug_assert_eq!(out.len(), treatment.nrows() * chunk.nrows());

        match self.metric {
            DistanceMetric::Euclidean => fill(treatment, chunk, out, |u, v| sq_euclidean(u, v).sqrt()),
            DistanceMetric::SqEuclidean => fill(treatment, chunk, out, sq_euclidean),
            DistanceMetric::Cityblock => fill(treatment, chunk, out, cityblock),
            DistanceMetric::Chebyshev => fill(treatment, chunk, out, chebyshev),
            DistanceMetric::Minkowski { p } => {
                fill(treatment, chunk, out, |u, v| minkowski(u, v, p))
            }
            DistanceMetric::Cosine => fill(treatment, chunk, out, cosine),
            DistanceMetric::Canberra => fill(treatment, chunk, out, canberra),
            DistanceMetric::BrayCurtis => fill(treatment, chunk, out, braycurtis),
            DistanceMetric::SEuclidean => {
                let inv_var = &self.inv_var;
                fill(treatment, chunk, out, |u, v| seuclidean(u, v, inv_var))
            }
        }
    }
}

/// Applies `f` to every (treatment row, chunk row) pair.
#[inline]
fn fill<F>(treatment: ArrayView2<'_, f64>, chunk: ArrayView2<'_, f64>, out: &mut [f64], f: F)
where
    F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64,
{
    let c = chunk.nrows();
    if c == 0 {
        return;
    }
    for (t_row, out_row) in treatment.outer_iter().zip(out.chunks_exact_mut(c)) {
        for (o, cp_row) in out_row.iter_mut().zip(chunk.outer_iter()) {
            *o = f(t_row, cp_row);
        }
    }
}

/// Inverse per-feature sample variance over treatment ∪ pool. Zero-variance
/// features get weight 0.
fn inverse_variances(treatment: ArrayView2<'_, f64>, pool: ArrayView2<'_, f64>) -> Vec<f64> {
    let n_features = treatment.ncols();
    let mut acc = vec![RunningVariance::new(); n_features];
    for row in treatment.outer_iter().chain(pool.outer_iter()) {
        for (a, &x) in acc.iter_mut().zip(row.iter()) {
            a.push(x);
        }
    }
    acc.iter()
        .map(|a| {
            let v = a.variance();
            if v > 0.0 { 1.0 / v } else { 0.0 }
        })
        .collect()
}

#[inline]
fn sq_euclidean(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    u.iter()
        .zip(v.iter())
        .map(|(&a, &b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

#[inline]
fn cityblock(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    u.iter().zip(v.iter()).map(|(&a, &b)| (a - b).abs()).sum()
}

#[inline]
fn chebyshev(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    // Plain fold so a NaN difference propagates instead of being skipped by f64::max.
    u.iter().zip(v.iter()).fold(0.0, |acc, (&a, &b)| {
        let d = (a - b).abs();
        if d > acc || d.is_nan() { d } else { acc }
    })
}

#[inline]
fn minkowski(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>, p: f64) -> f64 {
    u.iter()
        .zip(v.iter())
        .map(|(&a, &b)| (a - b).abs().powf(p))
        .sum::<f64>()
        .powf(1.0 / p)
}

#[inline]
fn cosine(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    let mut dot = 0.0;
    let mut nu = 0.0;
    let mut nv = 0.0;
    for (&a, &b) in u.iter().zip(v.iter()) {
        dot += a * b;
        nu += a * a;
        nv += b * b;
    }
    1.0 - dot / (nu.sqrt() * nv.sqrt())
}

#[inline]
fn canberra(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    u.iter()
        .zip(v.iter())
        .map(|(&a, &b)| {
            let denom = a.abs() + b.abs();
            if denom == 0.0 { 0.0 } else { (a - b).abs() / denom }
        })
        .sum()
}

#[inline]
fn braycurtis(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    let mut num = 0.0;
    let mut denom = 0.0;
    for (&a, &b) in u.iter().zip(v.iter()) {
        num += (a - b).abs();
        denom += (a + b).abs();
    }
    num / denom
}

#[inline]
fn seuclidean(u: ArrayView1<'_, f64>, v: ArrayView1<'_, f64>, inv_var: &[f64]) -> f64 {
    u.iter()
        .zip(v.iter())
        .zip(inv_var.iter())
        .map(|((&a, &b), &w)| {
            let d = a - b;
            w * d * d
        })
        .sum::<f64>()
        .sqrt()
}
